use std::error::Error;
use std::time::Duration;

use modbus_master::*;

fn main() -> Result<(), Box<dyn Error>> {
    // initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    // Create a context
    let mut ctx = ModbusContext::tcp("127.0.0.1", DEFAULT_PORT);
    ctx.set_slave(1)?;
    ctx.set_response_timeout(Duration::from_secs(1));
    ctx.set_error_recovery(ErrorRecoveryMode::Link | ErrorRecoveryMode::Protocol);
    ctx.set_decode_level(DecodeLevel::new(
        PduDecodeLevel::DataValues,
        AduDecodeLevel::Header,
        PhysDecodeLevel::Nothing,
    ));
    ctx.connect()?;

    // Send requests
    for (i, value) in ctx.read_coils(0, 10)?.iter().enumerate() {
        println!("index: {i} value: {value}");
    }

    let registers = ctx.read_holding_registers(0, 2)?;
    let registers = [registers[0], registers[1]];
    println!("float: {}", data::get_float(&registers));

    Ok(())
}
