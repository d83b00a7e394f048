//! Check a configuration file and the endpoint behind it.
//!
//! Usage: codeassist-probe [config.json]

use std::process::ExitCode;

use log::{error, info, warn};

use codeassist::{ConfigStore, Configuration, Orchestrator};

#[tokio::main]
async fn main() -> ExitCode
{   codeassist::init_logging();

    let store = match std::env::args().nth(1)
    {   Some(path) => match ConfigStore::load(&path)
        {   Ok(store) => store
          , Err(e) => {
              error!("Could not load {}: {}", path, e);
              return ExitCode::FAILURE;
            }
        }
      , None => ConfigStore::new(
          Configuration::default().with_env_overrides()
        )
    };

    let orchestrator = match Orchestrator::new(store)
    {   Ok(o) => o
      , Err(e) => {
          error!("Could not create client: {}", e);
          return ExitCode::FAILURE;
        }
    };

    let validation = orchestrator.validate();
    for issue in &validation.warnings
    {   warn!("{}: {}", issue.field, issue.message);
    }
    for issue in &validation.errors
    {   error!("{}: {}", issue.field, issue.message);
    }
    if !validation.is_valid
    {   return ExitCode::FAILURE;
    }

    if orchestrator.test_connection().await
    {   info!("Endpoint reachable and credentials accepted");
        ExitCode::SUCCESS
    } else
    {   error!("Connection test failed");
        ExitCode::FAILURE
    }
}
