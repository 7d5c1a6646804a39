use std::net::SocketAddr;

/// Shortest peer id the relay will hand out.
pub const MIN_ID_LEN: usize = 9;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub max_connections: usize,
    pub id_len: usize,
    /// Seed for peer id generation. `None` seeds from OS entropy.
    pub rng_seed: Option<u64>,
    /// Capacity of the connection -> relay command channel
    pub command_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            max_connections: 256,
            id_len: MIN_ID_LEN,
            rng_seed: None,
            command_buffer: 256,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `PORT`, `RELAY_LISTEN_ADDR`, `RELAY_MAX_CONNECTIONS`
    /// and `RELAY_RNG_SEED`.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| format!("PORT must be a port number, got {:?}", port))?;
            config.listen_addr = format!("0.0.0.0:{}", port);
        }
        // A full address wins over a bare port.
        if let Some(addr) = lookup("RELAY_LISTEN_ADDR") {
            config.listen_addr = addr.trim().to_string();
        }
        if let Some(max) = lookup("RELAY_MAX_CONNECTIONS") {
            config.max_connections = max
                .trim()
                .parse()
                .map_err(|_| format!("RELAY_MAX_CONNECTIONS must be an integer, got {:?}", max))?;
        }
        if let Some(seed) = lookup("RELAY_RNG_SEED") {
            config.rng_seed = Some(
                seed.trim()
                    .parse()
                    .map_err(|_| format!("RELAY_RNG_SEED must be an integer, got {:?}", seed))?,
            );
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(format!(
                "listen_addr must be a socket address, got {:?}",
                self.listen_addr
            ));
        }
        if self.max_connections == 0 {
            return Err("max_connections must be > 0".to_string());
        }
        if self.id_len < MIN_ID_LEN {
            return Err(format!("id_len must be >= {}", MIN_ID_LEN));
        }
        if self.command_buffer == 0 {
            return Err("command_buffer must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_server_config_is_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_env_gives_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
        assert_eq!(config.rng_seed, None);
    }

    #[test]
    fn port_env_sets_listen_addr() {
        let config = ServerConfig::from_lookup(lookup_from(&[("PORT", "8080")])).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn listen_addr_env_overrides_port() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("RELAY_LISTEN_ADDR", "127.0.0.1:9100"),
        ]))
        .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9100");
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(ServerConfig::from_lookup(lookup_from(&[("PORT", "eighty")])).is_err());
        assert!(ServerConfig::from_lookup(lookup_from(&[("PORT", "70000")])).is_err());
    }

    #[test]
    fn seed_and_limit_are_parsed() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("RELAY_RNG_SEED", "42"),
            ("RELAY_MAX_CONNECTIONS", "8"),
        ]))
        .unwrap();
        assert_eq!(config.rng_seed, Some(42));
        assert_eq!(config.max_connections, 8);
    }

    #[test]
    fn short_ids_invalid() {
        let config = ServerConfig {
            id_len: 4,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_connections_invalid() {
        let config = ServerConfig {
            max_connections: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unparsable_listen_addr_invalid() {
        let config = ServerConfig {
            listen_addr: "localhost".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
