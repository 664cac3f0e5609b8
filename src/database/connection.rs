use log::error;
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use postgres_openssl::MakeTlsConnector;
use tokio_postgres::Client;
use url::Url;

pub fn create_ssl_connector(sslrootcert_path: &str) -> Result<MakeTlsConnector, String> {
    let mut builder =
        SslConnector::builder(SslMethod::tls()).map_err(|e| format!("SSL builder error: {}", e))?;

    builder
        .set_ca_file(sslrootcert_path)
        .map_err(|e| format!("Error loading CA cert: {}", e))?;

    builder.set_verify(SslVerifyMode::NONE); // TEMPORARY FOR SELF-SIGNED CERTS

    Ok(MakeTlsConnector::new(builder.build()))
}

/// Open a long-lived client for the collector
///
/// The connection string carries an `sslrootcert` query parameter pointing
/// at the CA file; tokio-postgres does not understand it, so it is split
/// off before connecting and fed to the SSL connector instead. The
/// connection driver is spawned onto the runtime; if it dies, subsequent
/// queries fail and are handled by the caller per operation.
pub async fn connect(database_url: &str) -> Result<Client, String> {
    let url = Url::parse(database_url).map_err(|e| format!("URL parse error: {}", e))?;

    let mut sslrootcert_path = None;
    let mut clean_params = Vec::new();
    for (key, value) in url.query_pairs() {
        if key == "sslrootcert" {
            sslrootcert_path = Some(value.to_string());
        } else {
            clean_params.push((key.into_owned(), value.into_owned()));
        }
    }

    let sslrootcert_path = match sslrootcert_path {
        Some(path) => path,
        None => return Err("sslrootcert parameter missing".into()),
    };

    let mut clean_url = url.clone();
    clean_url.set_query(None);
    if !clean_params.is_empty() {
        let query = clean_params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        clean_url.set_query(Some(&query));
    }
    let clean_database_url = clean_url.to_string();

    let connector = create_ssl_connector(&sslrootcert_path)?;

    let (client, connection) = tokio_postgres::connect(&clean_database_url, connector)
        .await
        .map_err(|e| format!("Connection error: {}", e))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("Connection error: {}", e);
        }
    });

    Ok(client)
}
