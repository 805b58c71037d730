//! Command-line Modbus master

use std::num::ParseIntError;
use std::str::FromStr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use modbus_master::*;

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("{0}")]
    BadInt(#[from] ParseIntError),
    #[error("bad character in bit string: {0}")]
    BadCharInBitString(char),
    #[error("{0}")]
    Request(#[from] RequestError),
}

#[derive(Parser)]
#[command(name = "modbus-master-client")]
#[command(about = "A command line program for making Modbus master requests")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    link: LinkArgs,

    #[arg(short = 'i', long, help = "The slave id, defaults to 255 on TCP and 1 on RTU")]
    id: Option<u8>,

    #[arg(long, default_value_t = 500, help = "Response timeout in milliseconds")]
    response_timeout: u64,

    #[arg(long, default_value_t = 500, help = "Inter-byte timeout in milliseconds")]
    byte_timeout: u64,

    #[arg(
        long,
        value_enum,
        default_value_t = Recovery::None,
        help = "Recovery applied after link or framing errors"
    )]
    recovery: Recovery,

    #[arg(short = 'd', long, help = "Decode requests and replies down to the physical layer")]
    debug: bool,

    #[arg(short = 'p', long, help = "Optional polling period in milliseconds")]
    period: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct LinkArgs {
    #[arg(
        long,
        default_value = "127.0.0.1",
        help = "Host name or IP address of a Modbus TCP server"
    )]
    host: String,

    #[arg(long, default_value_t = DEFAULT_PORT, help = "TCP port of the server")]
    port: u16,

    #[arg(long, help = "Path of a serial port, selects RTU framing instead of TCP")]
    serial: Option<String>,

    #[arg(long, default_value_t = 9600, help = "Baud rate of the serial port")]
    baud_rate: u32,

    #[arg(
        long,
        value_enum,
        default_value_t = SerialParity::None,
        help = "Parity of the serial port"
    )]
    parity: SerialParity,

    #[arg(long, default_value_t = 8, help = "Data bits of the serial port (5 to 8)")]
    data_bits: u8,

    #[arg(long, default_value_t = 1, help = "Stop bits of the serial port (1 or 2)")]
    stop_bits: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Recovery {
    None,
    Link,
    Protocol,
    All,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum SerialParity {
    None,
    Odd,
    Even,
}

#[derive(Subcommand)]
enum Command {
    #[command(name = "rc", about = "read coils")]
    ReadCoils(ReadArgs),

    #[command(name = "rdi", about = "read discrete inputs")]
    ReadDiscreteInputs(ReadArgs),

    #[command(name = "rhr", about = "read holding registers")]
    ReadHoldingRegisters(ReadArgs),

    #[command(name = "rir", about = "read input registers")]
    ReadInputRegisters(ReadArgs),

    #[command(name = "wsc", about = "write single coil")]
    WriteSingleCoil(WriteSingleCoilArgs),

    #[command(name = "wsr", about = "write single register")]
    WriteSingleRegister(WriteSingleRegisterArgs),

    #[command(name = "wmc", about = "write multiple coils")]
    WriteMultipleCoils(WriteMultipleCoilsArgs),

    #[command(name = "wmr", about = "write multiple registers")]
    WriteMultipleRegisters(WriteMultipleRegistersArgs),

    #[command(name = "wrr", about = "write multiple registers, then read holding registers")]
    WriteAndReadRegisters(WriteAndReadArgs),

    #[command(name = "rsi", about = "report slave id")]
    ReportSlaveId,
}

#[derive(Args)]
struct ReadArgs {
    #[arg(short = 's', long, help = "the starting address")]
    start: u16,

    #[arg(short = 'q', long, help = "quantity of values")]
    quantity: u16,
}

#[derive(Args)]
struct WriteSingleCoilArgs {
    #[arg(short = 'i', long, help = "the address of the coil")]
    index: u16,

    #[arg(short = 'v', long, help = "the value of the coil (true or false)")]
    value: bool,
}

#[derive(Args)]
struct WriteSingleRegisterArgs {
    #[arg(short = 'i', long, help = "the address of the register")]
    index: u16,

    #[arg(short = 'v', long, help = "the value of the register")]
    value: u16,
}

#[derive(Args)]
struct WriteMultipleCoilsArgs {
    #[arg(short = 's', long, help = "the starting address of the coils")]
    start: u16,

    #[arg(
        short = 'v',
        long,
        help = "the values of the coils specified as a string of 1 and 0 (e.g. 10100011)"
    )]
    values: String,
}

#[derive(Args)]
struct WriteMultipleRegistersArgs {
    #[arg(short = 's', long, help = "the starting address of the registers")]
    start: u16,

    #[arg(
        short = 'v',
        long,
        help = "the values of the registers specified as a comma delimited list (e.g. 1,4,7)"
    )]
    values: String,
}

#[derive(Args)]
struct WriteAndReadArgs {
    #[arg(long, help = "the starting address of the registers to write")]
    write_start: u16,

    #[arg(
        short = 'v',
        long,
        help = "the values to write specified as a comma delimited list (e.g. 1,4,7)"
    )]
    values: String,

    #[arg(long, help = "the starting address of the registers to read")]
    read_start: u16,

    #[arg(short = 'q', long, help = "quantity of registers to read")]
    quantity: u16,
}

impl From<Recovery> for ErrorRecoveryMode {
    fn from(value: Recovery) -> Self {
        match value {
            Recovery::None => ErrorRecoveryMode::None,
            Recovery::Link => ErrorRecoveryMode::Link,
            Recovery::Protocol => ErrorRecoveryMode::Protocol,
            Recovery::All => ErrorRecoveryMode::LinkAndProtocol,
        }
    }
}

impl LinkArgs {
    fn serial_settings(&self) -> SerialSettings {
        let data_bits = match self.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        };
        let stop_bits = match self.stop_bits {
            2 => StopBits::Two,
            _ => StopBits::One,
        };
        let parity = match self.parity {
            SerialParity::None => Parity::None,
            SerialParity::Odd => Parity::Odd,
            SerialParity::Even => Parity::Even,
        };
        SerialSettings {
            baud_rate: self.baud_rate,
            data_bits,
            flow_control: FlowControl::None,
            stop_bits,
            parity,
        }
    }

    fn transport(&self) -> Box<dyn Transport> {
        match &self.serial {
            Some(path) => Box::new(RtuTransport::new(path.as_str(), self.serial_settings())),
            None => Box::new(TcpTransport::new(self.host.as_str(), self.port)),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    if let Err(ref e) = run() {
        println!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Error> {
    let cli = Cli::parse();

    let mut ctx = ModbusContext::new(cli.link.transport());
    if let Some(id) = cli.id {
        ctx.set_slave(id)?;
    }
    ctx.set_timeouts(Timeouts::new(
        Duration::from_millis(cli.response_timeout),
        Duration::from_millis(cli.byte_timeout),
    ));
    ctx.set_error_recovery(cli.recovery.into());
    if cli.debug {
        ctx.set_debug(true);
    } else {
        ctx.set_decode_level(PduDecodeLevel::DataValues.into());
    }

    ctx.connect()?;

    match cli.period {
        None => run_command(&cli.command, &mut ctx),
        Some(period_ms) => {
            let period = Duration::from_millis(period_ms);
            loop {
                if let Err(err) = run_command(&cli.command, &mut ctx) {
                    tracing::warn!("{err}");
                }
                std::thread::sleep(period);
            }
        }
    }
}

fn run_command<T: Transport>(command: &Command, ctx: &mut ModbusContext<T>) -> Result<(), Error> {
    match command {
        Command::ReadCoils(args) => {
            let values = ctx.read_coils(args.start, args.quantity)?;
            print_values(args.start, &values);
        }
        Command::ReadDiscreteInputs(args) => {
            let values = ctx.read_discrete_inputs(args.start, args.quantity)?;
            print_values(args.start, &values);
        }
        Command::ReadHoldingRegisters(args) => {
            let values = ctx.read_holding_registers(args.start, args.quantity)?;
            print_values(args.start, &values);
        }
        Command::ReadInputRegisters(args) => {
            let values = ctx.read_input_registers(args.start, args.quantity)?;
            print_values(args.start, &values);
        }
        Command::WriteSingleCoil(args) => {
            ctx.write_single_coil(args.index, args.value)?;
        }
        Command::WriteSingleRegister(args) => {
            ctx.write_single_register(args.index, args.value)?;
        }
        Command::WriteMultipleCoils(args) => {
            let values = parse_bit_values(&args.values)?;
            ctx.write_multiple_coils(args.start, &values)?;
        }
        Command::WriteMultipleRegisters(args) => {
            let values = parse_register_values(&args.values)?;
            ctx.write_multiple_registers(args.start, &values)?;
        }
        Command::WriteAndReadRegisters(args) => {
            let values = parse_register_values(&args.values)?;
            let read = ctx.write_and_read_registers(
                args.write_start,
                &values,
                args.read_start,
                args.quantity,
            )?;
            print_values(args.read_start, &read);
        }
        Command::ReportSlaveId => {
            let payload = ctx.report_slave_id()?;
            let hex: Vec<String> = payload.iter().map(|b| format!("{b:02X}")).collect();
            println!("slave id: {}", hex.join(" "));
        }
    }
    Ok(())
}

fn print_values<V: std::fmt::Display>(start: u16, values: &[V]) {
    for (index, value) in (start..).zip(values) {
        println!("index: {index} value: {value}");
    }
}

// the right-most character is the value at the starting address
fn parse_bit_values(values_str: &str) -> Result<Vec<bool>, Error> {
    let mut values: Vec<bool> = Vec::new();
    for c in values_str.chars().rev() {
        match c {
            '0' => values.push(false),
            '1' => values.push(true),
            _ => return Err(Error::BadCharInBitString(c)),
        }
    }
    Ok(values)
}

fn parse_register_values(values_str: &str) -> Result<Vec<u16>, ParseIntError> {
    let mut values: Vec<u16> = Vec::new();
    for value in values_str.split(',') {
        values.push(u16::from_str(value.trim())?);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_strings_are_read_right_to_left() {
        assert_eq!(
            parse_bit_values("1101").unwrap(),
            vec![true, false, true, true]
        );
        assert!(matches!(
            parse_bit_values("10x"),
            Err(Error::BadCharInBitString('x'))
        ));
    }

    #[test]
    fn register_lists_are_comma_delimited() {
        assert_eq!(parse_register_values("1, 4,7").unwrap(), vec![1, 4, 7]);
        assert!(parse_register_values("1,,2").is_err());
    }

    #[test]
    fn serial_arguments_map_to_port_settings() {
        let cli = Cli::parse_from([
            "modbus-master-client",
            "--serial",
            "/dev/ttyUSB0",
            "--baud-rate",
            "19200",
            "--parity",
            "even",
            "--stop-bits",
            "2",
            "rhr",
            "-s",
            "0",
            "-q",
            "4",
        ]);
        let settings = cli.link.serial_settings();
        assert_eq!(settings.baud_rate, 19200);
        assert_eq!(settings.parity, Parity::Even);
        assert_eq!(settings.stop_bits, StopBits::Two);
        assert_eq!(settings.data_bits, DataBits::Eight);
        assert_eq!(cli.link.transport().frame_type(), FrameType::Rtu);
    }
}
