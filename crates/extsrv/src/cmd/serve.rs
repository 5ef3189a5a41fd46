use std::sync::Arc;

use extsrv_adapter::{
    Adapter, AdapterConfig, CancellationToken, HandshakeConfig, MemoryStore, Server,
};
use tracing::info;

use crate::cmd::{parse_duration, ServeArgs};
use crate::exit::{adapter_error, store_error, CliError, CliResult, INTERNAL, SUCCESS};

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let config = AdapterConfig::new(&args.endpoint.socket, args.standalone, args.max_recv_bytes);
    let handshake = HandshakeConfig {
        timeout: parse_duration(&args.handshake_timeout)?,
        ..HandshakeConfig::default()
    };

    let store = match &args.store {
        Some(path) => {
            let store = MemoryStore::from_json_file(path)
                .map_err(|err| store_error("failed to load store", err))?;
            info!(path = %path.display(), objects = store.len(), "store loaded");
            store
        }
        None => MemoryStore::empty(),
    };

    let adapter = Adapter::new(Arc::new(store), config);
    let server = Server::bind(Arc::new(adapter))
        .map_err(|err| adapter_error("bind failed", err))?
        .with_handshake_config(handshake);
    let limits = server.adapter().config();
    info!(
        path = %server.path().display(),
        max_receive_bytes = limits.max_receive_len(),
        max_reply_bytes = limits.max_reply_bytes(),
        "extension server bound"
    );

    let shutdown = CancellationToken::new();
    install_ctrlc_handler(shutdown.clone())?;

    server
        .serve(&shutdown)
        .map_err(|err| adapter_error("serve failed", err))?;
    Ok(SUCCESS)
}

fn install_ctrlc_handler(shutdown: CancellationToken) -> CliResult<()> {
    ctrlc::set_handler(move || {
        shutdown.cancel();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
