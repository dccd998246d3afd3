use anyhow::Result;

use shiftr::args::{CliAction, display_help, display_version_info};
use shiftr::backend::{self, create_method};
use shiftr::constants::EXIT_FAILURE;
use shiftr::location::{self, create_provider};
use shiftr::{ControlContext, Log, Options, ParsedArgs, modes, send_commands};

fn main() {
    let parsed = ParsedArgs::from_env();

    let result = match parsed.action {
        CliAction::ShowVersion => {
            display_version_info();
            Ok(())
        }
        CliAction::ShowHelp => {
            display_help();
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            display_help();
            std::process::exit(EXIT_FAILURE);
        }
        CliAction::ListMethods => {
            backend::list_methods();
            Ok(())
        }
        CliAction::ListProviders => {
            location::list_providers();
            Ok(())
        }
        CliAction::MethodHelp(name) => create_method(&name).map(|method| method.print_help()),
        CliAction::ProviderHelp(name) => create_provider(&name).map(|provider| provider.print_help()),
        CliAction::SendCommands { options, commands } => Options::load(&options).and_then(|options| {
            let socket = options.socket.ok_or_else(|| {
                anyhow::anyhow!("No control socket configured; use -s PATH or set `socket' in the config")
            })?;
            send_commands(&socket, &commands)
        }),
        CliAction::Run(cli) => run(cli),
    };

    if let Err(e) = result {
        Log::log_error(&format!("{:#}", e));
        std::process::exit(EXIT_FAILURE);
    }
}

fn run(cli: shiftr::CliOptions) -> Result<()> {
    let options = Options::load(&cli)?;
    Log::set_verbose(options.verbose);

    Log::log_version();
    options.log_options();

    let control = ControlContext::new();
    modes::run(&options, &control)?;

    Log::log_end();
    Ok(())
}
