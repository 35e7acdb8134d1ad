// semprov-api: Async HTTP transport and reply parsing for SEMP appliances

pub mod client;
pub mod error;
pub mod influx;
pub mod reply;
pub mod transport;
pub mod xml;

pub use client::{ApplianceClient, RawReply};
pub use error::Error;
pub use reply::{ExecuteResult, Reply};
pub use influx::InfluxWriter;
pub use transport::{CertPolicy, DEFAULT_TIMEOUT, Transport};
pub use xml::XmlNode;
