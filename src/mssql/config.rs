use tiberius::{AuthMethod, Config as TiberiusConfig};

use crate::config::{ConnectOptions, DEFAULT_PORT, ServerAddress};

/// Translate facade options into a tiberius `Config`.
///
/// Named instances leave the port unset so the SQL Browser lookup can resolve it.
pub(crate) fn build_tiberius_config(opts: &ConnectOptions) -> TiberiusConfig {
    let address = opts.server_address();
    let mut config = TiberiusConfig::new();
    config.host(&address.host);
    if let Some(port) = resolve_port(&address) {
        config.port(port);
    }
    if let Some(instance) = &address.instance_name {
        config.instance_name(instance);
    }
    config.database(&opts.database);
    config.authentication(AuthMethod::sql_server(&opts.user, &opts.password));
    if opts.trust_server_certificate {
        config.trust_cert();
    }
    config.application_name("mssql-connection");
    config
}

fn resolve_port(address: &ServerAddress) -> Option<u16> {
    match (address.port, &address.instance_name) {
        (Some(port), _) => Some(port),
        (None, Some(_)) => None,
        (None, None) => Some(DEFAULT_PORT),
    }
}
