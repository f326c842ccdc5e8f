use crate::configuration;

mod error;
pub mod lock;
pub mod server;
pub mod unlock;

pub use error::Error;

fn check_resource(resource: &str) -> Result<(), configuration::Error> {
    if resource.is_empty() {
        return Err(configuration::Error::InvalidResource(
            "resource name must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{ClientConfig, ServerConfig};

    async fn start_server() -> String {
        let options = server::Options {
            address: "127.0.0.1:0".to_string(),
        };
        let server = server::Command::new(&options, &ServerConfig::default())
            .await
            .expect("Failed to start server");
        let address = server.local_addr().unwrap().to_string();
        tokio::spawn(server.run());
        address
    }

    fn lock_command(address: &str, resource: &str, lifetime: &str) -> lock::Command {
        let options = lock::Options {
            address: address.to_string(),
            resource: resource.to_string(),
            lifetime: lifetime.to_string(),
        };
        lock::Command::new(&options, &ClientConfig::default()).unwrap()
    }

    fn unlock_command(address: &str, resource: &str, version: u64) -> unlock::Command {
        let options = unlock::Options {
            address: address.to_string(),
            resource: resource.to_string(),
            version,
        };
        unlock::Command::new(&options, &ClientConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_lock_unlock_session() {
        let address = start_server().await;

        let output = lock_command(&address, "foo", "10s").execute().await.unwrap();
        assert_eq!(output, "Successfully locked foo version 1.");

        let error = lock_command(&address, "foo", "1m")
            .execute()
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "foo is already locked.");

        let output = unlock_command(&address, "foo", 1).execute().await.unwrap();
        assert_eq!(output, "Successfully unlocked foo version 1.");

        let output = lock_command(&address, "foo", "1m").execute().await.unwrap();
        assert_eq!(output, "Successfully locked foo version 2.");
    }

    #[tokio::test]
    async fn test_unlock_failures_are_reported() {
        let address = start_server().await;

        let error = unlock_command(&address, "foo", 1)
            .execute()
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "foo is already unlocked");

        lock_command(&address, "foo", "1m").execute().await.unwrap();
        let error = unlock_command(&address, "foo", 7)
            .execute()
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "foo: expected version 1, got version 7");
    }

    #[test]
    fn test_invalid_lifetime_is_rejected_before_any_call() {
        let options = lock::Options {
            address: "unreachable.invalid:1".to_string(),
            resource: "foo".to_string(),
            lifetime: "soon".to_string(),
        };
        let result = lock::Command::new(&options, &ClientConfig::default());
        assert!(matches!(
            result,
            Err(configuration::Error::InvalidLifetime(lifetime)) if lifetime == "soon"
        ));
    }

    #[test]
    fn test_empty_resource_is_rejected_before_any_call() {
        let options = unlock::Options {
            address: "unreachable.invalid:1".to_string(),
            resource: String::new(),
            version: 1,
        };
        let result = unlock::Command::new(&options, &ClientConfig::default());
        assert!(matches!(
            result,
            Err(configuration::Error::InvalidResource(_))
        ));
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let options = server::Options {
            address: listener.local_addr().unwrap().to_string(),
        };

        let result = server::Command::new(&options, &ServerConfig::default()).await;
        assert!(matches!(result, Err(Error::IO(_))));
    }
}
