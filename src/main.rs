use BatchTank::Examples::cstr_examples::cstr_examples;
use BatchTank::Utils::logging::{init_logging, level_from_env};
use BatchTank::settings::RunSettings;
use log::{error, info};

pub fn main() {
    if let Err(e) = init_logging(level_from_env("BATCHTANK_LOG"), None) {
        eprintln!("failed to set up logging: {e}");
    }
    // batchtank [settings.json] [task]
    let args: Vec<String> = std::env::args().collect();
    let settings = match args.get(1) {
        Some(path) => match RunSettings::from_file(path) {
            Ok(settings) => settings,
            Err(e) => {
                error!("{e}");
                std::process::exit(1);
            }
        },
        None => {
            info!("no settings file given, running with defaults");
            RunSettings::default()
        }
    };
    let task: usize = args.get(2).and_then(|t| t.parse().ok()).unwrap_or(0);
    cstr_examples(task, &settings);
}
