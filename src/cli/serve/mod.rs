//! HTTP front end.
//!
//! A single `tiny_http` listener hands each request to a rayon worker,
//! which converts it, runs it through the [`Dispatcher`] and writes the
//! reply. All workers share one dispatcher, so path locks and the key
//! cache are process-wide.

mod lifecycle;
mod request;

use crate::{config::ServerConfig, core, ldp::Dispatcher, ldp::Reply, log};
use anyhow::{Context, Result};
use request::RequestPolicy;
use std::any::Any;
use std::fs;
use std::io;
use std::sync::Arc;
use tiny_http::{Request, Server};

/// Bind the listener and serve until Ctrl+C.
pub fn serve(config: &ServerConfig) -> Result<()> {
    let root = &config.storage.root;
    fs::create_dir_all(root)
        .with_context(|| format!("failed to create storage root {}", root.display()))?;

    let dispatcher = Arc::new(Dispatcher::new(config)?);
    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    lifecycle::register_server_for_shutdown(Arc::clone(&server));

    log!("serve"; "{}://{} -> {}", config.serve.scheme, addr, root.display());

    run_request_loop(&server, dispatcher, config)
}

fn run_request_loop(
    server: &Server,
    dispatcher: Arc<Dispatcher>,
    config: &ServerConfig,
) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.serve.workers)
        .thread_name(|i| format!("ldpd-worker-{i}"))
        .panic_handler(|panic| log!("serve"; "worker panicked: {}", panic_message(&*panic)))
        .build()
        .context("failed to create worker pool")?;
    let policy = Arc::new(RequestPolicy::from_config(config));

    for request in server.incoming_requests() {
        if core::is_shutdown() {
            break;
        }
        let dispatcher = Arc::clone(&dispatcher);
        let policy = Arc::clone(&policy);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &dispatcher, &policy) {
                log!("serve"; "request error: {e}");
            }
        });
    }

    log!("serve"; "stopped");
    Ok(())
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

/// Handle a single HTTP request
fn handle_request(
    mut request: Request,
    dispatcher: &Dispatcher,
    policy: &RequestPolicy,
) -> io::Result<()> {
    let reply = match request::read(&mut request, policy) {
        Ok(req) => dispatcher.handle(&req),
        Err(err) => Reply::from(&err),
    };
    request::respond(request, reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic;

    #[test]
    fn test_panic_message() {
        let payload = panic::catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(&*payload), "boom 1");
        let payload = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(&*payload), "static");
        let payload = panic::catch_unwind(|| panic::panic_any(7u8)).unwrap_err();
        assert_eq!(panic_message(&*payload), "unknown panic");
    }
}
