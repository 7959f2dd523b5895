//! Source RCON relay. One command per connection, bounded by the call
//! timeout, run on its own task so an unreachable game server never stalls
//! an event handler.

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::config::CALL_TIMEOUT;
use crate::error::BotError;

/// Longest server response we relay back into a Discord embed.
const RESPONSE_LIMIT: usize = 1000;

/// Connect to `host:port`, run one command, return the raw response text.
pub async fn run(address: &str, password: &str, command: &str) -> Result<String, BotError> {
    let (host, port) = split_address(address)?;
    let addr = format!("{host}:{port}");
    let password = password.to_string();
    let command = command.to_string();
    debug!(%addr, %command, "dispatching rcon command");

    let mut worker = tokio::spawn(async move {
        let mut conn = rcon::Connection::<TcpStream>::builder()
            .connect(addr.as_str(), &password)
            .await?;
        conn.cmd(&command).await
    });

    match timeout(CALL_TIMEOUT, &mut worker).await {
        Err(_) => {
            worker.abort();
            Err(BotError::RemoteCommand(format!(
                "no response from the server after {}s",
                CALL_TIMEOUT.as_secs()
            )))
        }
        Ok(Err(join_err)) => Err(BotError::RemoteCommand(join_err.to_string())),
        Ok(Ok(Err(rcon_err))) => Err(BotError::RemoteCommand(rcon_err.to_string())),
        Ok(Ok(Ok(response))) => Ok(response),
    }
}

/// Bound a server response before it goes into an embed.
pub fn truncate_response(response: &str) -> String {
    if response.chars().count() <= RESPONSE_LIMIT {
        return response.to_string();
    }
    let truncated: String = response.chars().take(RESPONSE_LIMIT).collect();
    format!("{truncated}...")
}

fn split_address(address: &str) -> Result<(&str, u16), BotError> {
    let invalid = || BotError::RemoteCommand(format!("invalid server address `{address}`"));
    let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() {
        return Err(invalid());
    }
    let port: u16 = port.parse().map_err(|_| invalid())?;
    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_host_and_port() {
        assert_eq!(split_address("192.0.2.1:27015").unwrap(), ("192.0.2.1", 27015));
        assert!(split_address("192.0.2.1").is_err());
        assert!(split_address(":27015").is_err());
        assert!(split_address("host:notaport").is_err());
    }

    #[test]
    fn short_responses_pass_through_untouched() {
        assert_eq!(truncate_response("ok"), "ok");
    }

    #[test]
    fn long_responses_are_bounded() {
        let long = "x".repeat(2500);
        let shown = truncate_response(&long);
        assert_eq!(shown.chars().count(), 1003);
        assert!(shown.ends_with("..."));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_remote_command_error() {
        // Port 9 on localhost refuses immediately; no 10s wait involved.
        let err = run("127.0.0.1:9", "secret", "status").await.unwrap_err();
        assert!(matches!(err, BotError::RemoteCommand(_)));
    }
}
