use std::process;

use idrec::config::{self, Config, Invocation, Storage};
use idrec::{logging, ContactStore, IdrecResult};

fn main() {
    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(Invocation::Run(config)) => config,
        Ok(Invocation::Help) => {
            println!("{}", config::usage());
            return;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information.");
            process::exit(1);
        }
    };

    if let Err(e) = logging::init_logging(&config.log_level, config.log_dir.as_deref()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let store = match open_store(&config.storage) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening database: {}", e);
            process::exit(1);
        }
    };

    let mut exit_code = 0;
    match &config.one_shot {
        Some(request) => match store.identify(request) {
            Ok(response) => match serde_json::to_string_pretty(&response) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    exit_code = 1;
                }
            },
            Err(e) => {
                println!("{}", serde_json::json!({ "error": e.to_string() }));
                exit_code = 1;
            }
        },
        None => idrec::cli::run(&store),
    }

    if let Err(e) = store.close() {
        eprintln!("Error closing database: {}", e);
        exit_code = 1;
    }
    process::exit(exit_code);
}

fn open_store(storage: &Storage) -> IdrecResult<ContactStore> {
    match storage {
        Storage::Memory => ContactStore::open_in_memory(),
        Storage::File(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            ContactStore::open(path)
        }
    }
}
