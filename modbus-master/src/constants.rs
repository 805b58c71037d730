/// Encoding of coil states in `write single coil` requests and replies
pub mod coil {
    /// u16 representation of COIL == ON when performing write single coil
    pub const ON: u16 = 0xFF00;
    /// u16 representation of COIL == OFF when performing write single coil
    pub const OFF: u16 = 0x0000;
}

/// Per-operation quantity ceilings from the Modbus application protocol specification
pub mod limits {
    /// Maximum count allowed in a read coils/discrete inputs request
    pub const MAX_READ_BITS_COUNT: u16 = 0x07D0;
    /// Maximum count allowed in a `write multiple coils` request
    pub const MAX_WRITE_BITS_COUNT: u16 = 0x07B0;
    /// Maximum count allowed in a read holding/input registers request
    pub const MAX_READ_REGISTERS_COUNT: u16 = 0x007D;
    /// Maximum count allowed in a `write multiple registers` request
    pub const MAX_WRITE_REGISTERS_COUNT: u16 = 0x007B;
    /// Maximum count allowed on the write side of a `write and read registers` request
    pub const MAX_RW_WRITE_REGISTERS_COUNT: u16 = 0x0079;
}

/// Special slave addresses
pub mod slave {
    /// Write requests sent to this address are executed by every device on a serial line
    pub const BROADCAST: u8 = 0x00;
    /// Highest address that may be assigned to an individual device
    pub const MAX_ADDRESS: u8 = 247;
    /// Unit identifier used on TCP when the remote server does not route on the unit id
    pub const TCP_ANY_SLAVE: u8 = 0xFF;
}

/// Sizes of the protocol and application data units
pub mod frame {
    /// Maximum size of a PDU (function code + data)
    pub const MAX_PDU_LENGTH: usize = 253;
    /// Maximum size of a TCP ADU (MBAP header + PDU)
    pub const MAX_TCP_ADU_LENGTH: usize = 260;
    /// Maximum size of an RTU ADU (address + PDU + CRC)
    pub const MAX_RTU_ADU_LENGTH: usize = 256;
    /// Size of the buffer that holds a read request or a single write on either framing,
    /// MBAP header (7) + function (1) + address (2) + quantity (2)
    ///
    /// Replies are not checked against it. A report slave id reply carrying a single byte is
    /// 10 bytes long on TCP and 6 on RTU.
    pub const MIN_REPLY_LENGTH: usize = 12;
}

pub(crate) mod exceptions {
    pub(crate) const ILLEGAL_FUNCTION: u8 = 0x01;
    pub(crate) const ILLEGAL_DATA_ADDRESS: u8 = 0x02;
    pub(crate) const ILLEGAL_DATA_VALUE: u8 = 0x03;
    pub(crate) const SLAVE_DEVICE_FAILURE: u8 = 0x04;
    pub(crate) const ACKNOWLEDGE: u8 = 0x05;
    pub(crate) const SLAVE_DEVICE_BUSY: u8 = 0x06;
    pub(crate) const NEGATIVE_ACKNOWLEDGE: u8 = 0x07;
    pub(crate) const MEMORY_PARITY_ERROR: u8 = 0x08;
    pub(crate) const GATEWAY_PATH_UNAVAILABLE: u8 = 0x0A;
    pub(crate) const GATEWAY_TARGET_FAILED_TO_RESPOND: u8 = 0x0B;
}
