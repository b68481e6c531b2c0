mod apply;
mod config;
mod db;
mod error;
mod ipc;
mod model;
mod query;
mod scope;
mod store;
mod validate;

use std::io::{self, BufRead, Write};

fn main() {
    config::init_tracing(config::log_json_from_env());
    let cfg = config::Config::from_env();
    let startup_workspace = cfg.workspace.clone();
    let mut state = ipc::AppState::new(cfg);

    if let Some(path) = startup_workspace {
        if let Err(e) = ipc::open_workspace(&mut state, path.clone()) {
            tracing::error!(workspace = %path.display(), error = %e, "startup workspace not opened");
        }
    }
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        json_logs = state.config.log_json,
        "recordsd ready"
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to echo back.
                tracing::debug!(error = %e, "unparseable request line");
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
