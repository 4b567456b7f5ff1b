use crate::core_network::network::create_listening_socket;
use crate::engine::Engine;
use crate::session::DataState;
use log::{debug, warn};
use std::net::Ipv4Addr;

/// Handles the PASV command.
///
/// Drops any previous data connection, (re)creates the passive listener if
/// needed and tells the client where to connect. The data connection itself
/// is accepted by the engine on the following ticks.
pub fn handle_pasv_command(engine: &mut Engine, _args: &str) {
    engine.close_data();
    engine.session.substate = DataState::Disconnected;

    if engine.listen_data.is_none() {
        match create_listening_socket(engine.config.pasv_port) {
            Ok(listener) => engine.listen_data = Some(listener),
            Err(e) => {
                warn!("Error creating data socket: {}", e);
                engine.send_reply(425, "Can't open data connection.");
                return;
            }
        }
    }

    let port = engine
        .listen_data
        .as_ref()
        .and_then(|listener| listener.local_addr().ok())
        .map(|addr| addr.port())
        .unwrap_or(engine.config.pasv_port);

    engine.session.dtimeout = 0;
    engine.session.substate = DataState::ListenForData;
    debug!("Data socket created on port {}", port);
    let reply = format_pasv_reply(engine.local_ip, port);
    engine.send_reply(227, &reply);
}

/// `Entering Passive Mode (h1,h2,h3,h4,p1,p2)`.
pub fn format_pasv_reply(ip: Ipv4Addr, port: u16) -> String {
    let [h1, h2, h3, h4] = ip.octets();
    format!(
        "Entering Passive Mode ({},{},{},{},{},{})",
        h1,
        h2,
        h3,
        h4,
        port >> 8,
        port & 0xff
    )
}

/// Decodes the address announced in a PASV reply line.
#[cfg(test)]
pub fn parse_pasv_reply(reply: &str) -> Option<(Ipv4Addr, u16)> {
    let start = reply.find('(')? + 1;
    let end = start + reply[start..].find(')')?;
    let fields: Vec<u8> = reply[start..end]
        .split(',')
        .map(|field| field.trim().parse().ok())
        .collect::<Option<Vec<u8>>>()?;
    if fields.len() != 6 {
        return None;
    }
    let ip = Ipv4Addr::new(fields[0], fields[1], fields[2], fields[3]);
    let port = (u16::from(fields[4]) << 8) | u16::from(fields[5]);
    Some((ip, port))
}
