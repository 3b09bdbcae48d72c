//! Velocity command monitor
//!
//! Subscribes to the velocity command stream of a running line executable and prints each
//! command. Usage: `cmd_monitor [endpoint]`, defaulting to `tcp://localhost:5020`.

use comms_if::{
    eqpt::drive::VelocityCmd,
    net::{MonitoredSocket, SocketOptions},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("tcp://localhost:5020"));

    // Create context
    let ctx = zmq::Context::new();

    // Block until the executable's publisher is up
    let socket = MonitoredSocket::new(
        &ctx,
        zmq::SUB,
        SocketOptions::blocking_subscriber(),
        &endpoint,
    )?;

    println!("Monitoring velocity commands on {}", endpoint);

    loop {
        let msg = socket.recv_string(0)?;

        match msg.map(|s| serde_json::from_str::<VelocityCmd>(&s)) {
            Ok(Ok(cmd)) => println!(
                "linear: {:+.3} m/s, angular: {:+.3} rad/s",
                cmd.linear_ms, cmd.angular_rads
            ),
            Ok(Err(e)) => println!("Invalid command: {}", e),
            Err(_) => println!("Non UTF-8 message"),
        }
    }
}
