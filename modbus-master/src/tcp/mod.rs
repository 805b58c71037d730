pub(crate) mod frame;
pub(crate) mod transport;

/// Port registered for Modbus TCP
pub const DEFAULT_PORT: u16 = 502;
