#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Analyze one wallet ledger file and print the full analysis.
    Analyze { path: String },
    /// Resolve a unified trust score for an address, optionally seeded
    /// with a known X handle.
    Trust {
        address: String,
        handle: Option<String>,
    },
    Help,
}

pub const USAGE: &str = "usage: conviction <command>\n\
    \n\
    commands:\n\
    \x20 analyze <ledger.json>        analyze a wallet ledger file\n\
    \x20 trust <address> [handle]     resolve a unified trust score\n\
    \x20 help                         show this message";

pub fn parse_args<I>(mut args: I) -> std::result::Result<Command, String>
where
    I: Iterator<Item = String>,
{
    // Drop argv[0].
    let _ = args.next();

    let Some(cmd) = args.next() else {
        return Ok(Command::Help);
    };

    match cmd.as_str() {
        "analyze" => {
            let path = args
                .next()
                .ok_or_else(|| "usage: conviction analyze <ledger.json>".to_string())?;
            Ok(Command::Analyze { path })
        }
        "trust" => {
            let address = args
                .next()
                .ok_or_else(|| "usage: conviction trust <address> [handle]".to_string())?;
            Ok(Command::Trust {
                address,
                handle: args.next(),
            })
        }
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => Err(format!("unknown command: {other}")),
    }
}
