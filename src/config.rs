//! Fixed catalog and environment-derived settings.

use chrono_tz::Tz;
use std::time::Duration;

/// All user-supplied times are interpreted in this timezone.
pub const TIMEZONE: Tz = chrono_tz::Europe::Paris;

/// Every reservation booked through the standard flow lasts this long.
pub const RESERVATION_HOURS: i64 = 2;

/// Ended reservations stay visible for this long before the sweep drops them.
pub const GRACE_HOURS: i64 = 1;

/// How long we wait for a reaction or a DM reply.
pub const SELECTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-call bound on every outbound network call (HTTP and RCON alike).
pub const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval of the stale-reservation sweep.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(6 * 3600);

pub const DEFAULT_PASSWORD: &str = "fish";
pub const DEFAULT_RCON: &str = "fishrcon";

pub const SERVER_CONFIG_5CP: &str = "etf2l_6v6_5cp";
pub const SERVER_CONFIG_KOTH: &str = "etf2l_6v6_koth";
pub const SERVER_CONFIG_FILES: [&str; 2] = [SERVER_CONFIG_5CP, SERVER_CONFIG_KOTH];

pub const AVAILABLE_MAPS: [&str; 9] = [
    "cp_granary_pro_rc16f",
    "cp_process_f12",
    "cp_gullywash_f9",
    "cp_metalworks_f5",
    "cp_snakewater_final1",
    "cp_sultry_b8a",
    "cp_sunshine",
    "koth_bagel_rc10",
    "koth_product_final",
];

/// `cp_*` maps run the 5CP ruleset, everything else runs KOTH.
pub fn config_file_for_map(map: &str) -> &'static str {
    if map.starts_with("cp_") {
        SERVER_CONFIG_5CP
    } else {
        SERVER_CONFIG_KOTH
    }
}

pub const MSG_USAGE: &str = "Use `!reserve now|<time> [<password>]` (e.g. `!reserve now`, `!reserve 20:00 mypassword`) or `!reserve <date> <time> [<password>]` (e.g. `!reserve 2025-05-05 20:00`). Time format HH:MM or HHhMM.";
pub const MSG_ALREADY_ACTIVE: &str =
    "You already have an active reservation. End it with `!end` first.";
pub const MSG_INVALID_DATE: &str = "Invalid date. Use YYYY-MM-DD, e.g. `2025-05-05`.";
pub const MSG_INVALID_TIME: &str = "Invalid time. Use 'now', HHhMM or HH:MM, e.g. `20h00` or `20:00`.";
pub const MSG_DATE_TOO_FAR: &str = "That date is too far out (one year at most).";
pub const MSG_DM_BLOCKED: &str = "Your DMs are blocked. Open your DMs to receive the RCON password.";
pub const MSG_TIMEOUT: &str = "Time ran out waiting for a reply.";
pub const MSG_NO_RESERVATION: &str = "No active reservation.";

pub const HELP_TEXT: &str = "\
📖 **Reservation Bot Help**\n\n\
━━━━━━━━━━━━━━━━━━\n\
🔹 **Reservation commands**\n\
━━━━━━━━━━━━━━━━━━\n\
🖥️ `!reserve now | <time> | [<date> <time>] [<password>]`\n\
 ↪ Reserves a server for 2h\n\
  Examples: `!reserve now`, `!reserve 2025-05-05 20:00`\n\n\
🔗 `!connect [<@user> | <ID>]`\n\
 ↪ Shows the connection info\n\
  Examples: `!connect`, `!connect 12345`\n\n\
📋 `!list`\n\
 ↪ Lists the active reservations\n\n\
🛑 `!end [<@user> | <ID>]`\n\
 ↪ Ends a reservation\n\
  Examples: `!end`, `!end 12345`\n\n\
━━━━━━━━━━━━━━━━━━\n\
🔹 **Server commands**\n\
━━━━━━━━━━━━━━━━━━\n\
🔄 `!changelevel [<@user> | <ID>] [<map>]`\n\
 ↪ Changes the current map\n\
  Examples: `!changelevel`, `!changelevel @user cp_process_f12`\n\n\
⚙️ `!exec [<@user> | <ID>] [<config>]`\n\
 ↪ Runs a server configuration\n\
  Examples: `!exec`, `!exec @user etf2l_6v6_5cp`\n\n\
🔐 `!rcon`\n\
 ↪ Sends you the RCON password by DM\n\n\
━━━━━━━━━━━━━━━━━━\n\
🔹 **Utilities**\n\
━━━━━━━━━━━━━━━━━━\n\
📅 `!dispo`\n\
 ↪ Collects your availability for the week\n\n\
❓ `!help`\n\
 ↪ Shows this help message\n";

/// Secrets pulled from the environment at startup.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub discord_token: String,
    pub serveme_api_key: String,
}

impl Secrets {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            discord_token: std::env::var("DISCORD_TOKEN")
                .map_err(|_| "missing DISCORD_TOKEN".to_string())?,
            serveme_api_key: std::env::var("SERVEME_API_KEY")
                .map_err(|_| "missing SERVEME_API_KEY".to_string())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cp_maps_use_the_5cp_config() {
        assert_eq!(config_file_for_map("cp_process_f12"), SERVER_CONFIG_5CP);
        assert_eq!(config_file_for_map("cp_sunshine"), SERVER_CONFIG_5CP);
    }

    #[test]
    fn other_maps_use_the_koth_config() {
        assert_eq!(config_file_for_map("koth_product_final"), SERVER_CONFIG_KOTH);
        assert_eq!(config_file_for_map("pl_upward"), SERVER_CONFIG_KOTH);
    }
}
