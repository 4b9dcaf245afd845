//! AT command catalog
//!
//! Maps symbolic operations to the labels the ESP-01 firmware understands.
//! The transaction engine does not depend on this table; it only needs a
//! label and a mode.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::protocol::{Command, Mode, ProtocolError, DEFAULT_TIMEOUT_MS};

/// Command group, as laid out in the firmware documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandGroup {
    /// Basic AT commands
    Basic,
    /// Wi-Fi commands
    Wifi,
    /// TCP/IP commands
    Ip,
    /// HTTP commands
    Http,
}

macro_rules! at_commands {
    ($( $group:ident { $( $name:ident => $label:literal, $desc:literal; )* } )*) => {
        /// Known AT commands
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum AtCommand {
            $( $( #[doc = $desc] $name, )* )*
        }

        impl AtCommand {
            /// Every command in the catalog
            pub const ALL: &'static [AtCommand] = &[ $( $( AtCommand::$name, )* )* ];

            /// Wire label (`AT+CWMODE`)
            pub fn label(&self) -> &'static str {
                match self {
                    $( $( AtCommand::$name => $label, )* )*
                }
            }

            /// One-line summary of what the command does
            pub fn description(&self) -> &'static str {
                match self {
                    $( $( AtCommand::$name => $desc, )* )*
                }
            }

            /// Group the command is documented under
            pub fn group(&self) -> CommandGroup {
                match self {
                    $( $( AtCommand::$name => CommandGroup::$group, )* )*
                }
            }
        }
    };
}

at_commands! {
    Basic {
        Test => "AT", "Test AT startup";
        Reset => "AT+RST", "Restart the module";
        Version => "AT+GMR", "Check version information";
        ListCommands => "AT+CMD", "List the AT commands supported by the firmware";
        Sleep => "AT+SLEEP", "Set the sleep mode";
        DeepSleep => "AT+GSLP", "Enter deep-sleep mode";
        Echo => "ATE", "Configure command echo (`ATE0`/`ATE1` are sent as bare labels)";
        FactoryReset => "AT+RESTORE", "Restore factory default settings";
        UartCurrent => "AT+UART_CUR", "Current UART configuration, not saved in flash";
        UartDefault => "AT+UART_DEF", "Default UART configuration, saved in flash";
        StoreMode => "AT+SYSSTORE", "Query/set the parameter store mode";
        PromptConfig => "AT+SYSMSG", "Query/set system prompt information";
    }
    Wifi {
        WifiMode => "AT+CWMODE", "Set the Wi-Fi mode (Station/SoftAP/Station+SoftAP)";
        WifiState => "AT+CWSTATE", "Query the Wi-Fi state and information";
        ConnectAp => "AT+CWJAP", "Connect to an AP";
        DisconnectAp => "AT+CWQAP", "Disconnect from an AP";
        ReconnectConfig => "AT+CWRECONNCFG", "Query/set the Wi-Fi reconnect configuration";
        ListApsConfig => "AT+CWLAPOPT", "Configure the output of AT+CWLAP";
        ListAps => "AT+CWLAP", "List available APs";
        SoftApConfig => "AT+CWSAP", "Query/set the SoftAP configuration";
        ListStations => "AT+CWLIF", "IP addresses of stations connected to the SoftAP";
        DisconnectStation => "AT+CWQIF", "Disconnect stations from the SoftAP";
        Dhcp => "AT+CWDHCP", "Enable/disable DHCP";
        DhcpLeases => "AT+CWDHCPS", "Query/set the SoftAP DHCP address pool";
        AutoConnect => "AT+CWAUTOCONN", "Connect to an AP automatically on power-up";
        StationMac => "AT+CIPSTAMAC", "Query/set the station MAC address";
        ApMac => "AT+CIPAPMAC", "Query/set the SoftAP MAC address";
        StationIp => "AT+CIPSTA", "Query/set the station IP address";
        ApIp => "AT+CIPAP", "Query/set the SoftAP IP address";
        Wps => "AT+WPS", "Enable WPS";
        Mdns => "AT+MDNS", "Configure mDNS";
        StationHostname => "AT+CWHOSTNAME", "Query/set the station host name";
        Country => "AT+CWCOUNTRY", "Query/set the Wi-Fi country code";
    }
    Ip {
        IpV6 => "AT+CIPV6", "Enable/disable IPv6";
        IpStatus => "AT+CIPSTATUS", "TCP/UDP/SSL connection status";
        Domain => "AT+CIPDOMAIN", "Resolve a domain name";
        Start => "AT+CIPSTART", "Open a TCP, UDP or SSL connection";
        Send => "AT+CIPSEND", "Send data in normal or passthrough mode";
        Close => "AT+CIPCLOSE", "Close a TCP/UDP/SSL connection";
        LocalAddress => "AT+CIFSR", "Local IP and MAC addresses";
        MuxMode => "AT+CIPMUX", "Enable/disable multiple connections";
        Server => "AT+CIPSERVER", "Create or delete a TCP/SSL server";
        ServerMaxConnections => "AT+CIPSERVERMAXCONN", "Query/set the server connection limit";
        TxMode => "AT+CIPMODE", "Query/set the transmission mode";
        AutoPassthrough => "AT+SAVETRANSLINK", "Enter passthrough mode on power-up";
        ServerTimeout => "AT+CIPSTO", "Query/set the local TCP server timeout";
        SntpConfig => "AT+CIPSNTPCFG", "Query/set the time zone and SNTP server";
        SntpTime => "AT+CIPSNTPTIME", "Query the SNTP time";
        Upgrade => "AT+CIUPDATE", "Upgrade the firmware over Wi-Fi";
        SslClients => "AT+CIPSSLCCONF", "Query/set SSL clients";
        SslCommonName => "AT+CIPSSLCCN", "Query/set the SSL client common name";
        SslSni => "AT+CIPSSLCSNI", "Query/set the SSL client SNI";
        SslAlpn => "AT+CIPSSLCALPN", "Query/set the SSL client ALPN";
        SslPsk => "AT+CIPSSLCPSK", "Query/set the SSL client pre-shared key";
        PassthroughReconnect => "AT+CIPRECONNINTV", "Query/set the passthrough reconnect interval";
        SocketMode => "AT+CIPRECVMODE", "Query/set the socket receive mode";
        SocketData => "AT+CIPRECVDATA", "Read socket data in passive receive mode";
        SocketDataLength => "AT+CIPRECVLEN", "Socket data length in passive receive mode";
        SocketConfig => "AT+CIPTCPOPT", "Query/set socket options";
        Ping => "AT+PING", "Ping a remote host";
        Dns => "AT+CIPDNS", "Query/set DNS servers";
    }
    Http {
        HttpClient => "AT+HTTPCLIENT", "Send an HTTP client request";
        HttpSize => "AT+HTTPGETSIZE", "Get the size of an HTTP resource";
        HttpPost => "AT+HTTPCPOST", "Post HTTP data of a given length";
    }
}

impl AtCommand {
    /// Reply timeout for this command
    pub fn timeout(&self) -> Duration {
        let ms = match self {
            AtCommand::Reset | AtCommand::FactoryReset => 3000,
            AtCommand::ConnectAp | AtCommand::ListAps | AtCommand::Wps => 20_000,
            AtCommand::Ping | AtCommand::Domain | AtCommand::Start => 5000,
            AtCommand::HttpClient | AtCommand::HttpSize | AtCommand::HttpPost => 10_000,
            AtCommand::Upgrade => 60_000,
            _ => DEFAULT_TIMEOUT_MS,
        };
        Duration::from_millis(ms)
    }

    /// Build a command for this label.
    ///
    /// `params` are only used in [`Mode::Set`]; the terminator is appended.
    pub fn command(&self, mode: Mode, params: &[String]) -> Result<Command, ProtocolError> {
        match mode {
            Mode::Set => Command::set(self.label(), params.iter().cloned()),
            Mode::Query => Command::query(self.label()),
            Mode::Execute => Command::execute(self.label()),
            Mode::None => Command::bare(self.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FrameEncoder;
    use std::collections::HashSet;

    #[test]
    fn test_labels() {
        assert_eq!(AtCommand::Test.label(), "AT");
        assert_eq!(AtCommand::WifiMode.label(), "AT+CWMODE");
        assert_eq!(AtCommand::SntpTime.label(), "AT+CIPSNTPTIME");
        assert_eq!(AtCommand::HttpPost.group(), CommandGroup::Http);
    }

    #[test]
    fn test_labels_unique_and_valid() {
        let mut seen = HashSet::new();
        for cmd in AtCommand::ALL {
            assert!(seen.insert(cmd.label()), "duplicate label {}", cmd.label());
            assert!(cmd.label().starts_with("AT"));
            assert!(cmd.command(Mode::Query, &[]).is_ok());
        }
    }

    #[test]
    fn test_every_command_has_description() {
        for cmd in AtCommand::ALL {
            assert!(!cmd.description().is_empty(), "{:?}", cmd);
        }
        assert_eq!(AtCommand::ListAps.description(), "List available APs");
        assert_eq!(AtCommand::SntpTime.description(), "Query the SNTP time");
    }

    #[test]
    fn test_timeouts() {
        assert_eq!(AtCommand::Test.timeout(), Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert!(AtCommand::ConnectAp.timeout() > AtCommand::Reset.timeout());
    }

    #[test]
    fn test_command_modes() {
        let encoder = FrameEncoder::default();
        let frame = encoder
            .encode(&AtCommand::WifiMode.command(Mode::Set, &["2".to_string()]).unwrap())
            .unwrap();
        assert_eq!(frame.as_bytes(), b"AT+CWMODE=2\n");

        let frame = encoder
            .encode(&AtCommand::Reset.command(Mode::Execute, &[]).unwrap())
            .unwrap();
        assert_eq!(frame.as_bytes(), b"AT+RST\n");
    }
}
