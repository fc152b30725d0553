use serde::Serialize;

/// One server entry parsed from a feed line.
///
/// Only the line parser constructs descriptors, so every instance is fully
/// populated from a single line. Field names are the ones templates see.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServerDescriptor {
    pub(crate) name: String,
    pub(crate) protocol_type: String,
    pub(crate) server: String,
    pub(crate) port: i64,
    pub(crate) password: String,
    pub(crate) use_udp: bool,
    pub(crate) sni: String,
    pub(crate) skip_cert_verify: bool,
    pub(crate) network_type: String,
}

impl ServerDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn protocol_type(&self) -> &str {
        &self.protocol_type
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Not range checked; feeds are trusted to carry sensible ports.
    pub fn port(&self) -> i64 {
        self.port
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn use_udp(&self) -> bool {
        self.use_udp
    }

    pub fn sni(&self) -> &str {
        &self.sni
    }

    pub fn skip_cert_verify(&self) -> bool {
        self.skip_cert_verify
    }

    pub fn network_type(&self) -> &str {
        &self.network_type
    }
}
