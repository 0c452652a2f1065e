use std::path::PathBuf;
use std::process::ExitCode;

use lume_viewer_lib::config::ViewerConfig;
use lume_viewer_lib::AnalysisService;

/// Set to any value for file:line, thread ids and trace-level output
const ENV_VERBOSE: &str = "LUME_LOG_VERBOSE";

#[tokio::main]
async fn main() -> ExitCode {
    // Control log level with RUST_LOG env var:
    //   RUST_LOG=debug ./lume-viewer
    //   RUST_LOG=lume_viewer_lib::orchestrator=trace ./lume-viewer <bundle> <hash>
    if std::env::var_os(ENV_VERBOSE).is_some() {
        lume_viewer_lib::logging::init_verbose();
    } else {
        lume_viewer_lib::logging::init();
    }

    let app_root = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Cannot determine working directory: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let config = match ViewerConfig::load_or_default(&app_root) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let service = AnalysisService::new(&config);
    let args: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();

    match args.as_slice() {
        [bundle, hash_file] => {
            if let Err(e) = service.start_analysis(bundle, hash_file).await {
                eprintln!("Analysis failed: {}", e);
                return ExitCode::FAILURE;
            }
        }
        [] => {}
        _ => {
            eprintln!("usage: lume-viewer [<bundle> <hash-file>]");
            return ExitCode::from(2);
        }
    }

    let snapshot = match service.load_snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&snapshot.summary()) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Cannot render summary: {}", e);
            ExitCode::FAILURE
        }
    }
}
