//! The scripted mission the engine plays headlessly.
//!
//! A handful of public relays and one mission server guarded by a
//! dictionary password and an encryption grid. The player routes through
//! every relay and starts cracking both challenges at once.

use rand::seq::SliceRandom;
use rust_decimal::Decimal;
use tracing::info;

use downlink_core::session::Session;
use downlink_sched::Challenge;
use downlink_trace::Computer;
use downlink_types::{EncryptionTier, HopId, HopKind, Point};

use crate::error::EngineError;

/// Public relays placed on the network.
const RELAY_COUNT: usize = 4;

/// Difficulty of the server's dictionary password.
const PASSWORD_DIFFICULTY: u32 = 6;

/// Currency paid for breaking into the mainframe.
const MISSION_REWARD: u32 = 1500;

/// Word list the demo mission draws passwords from and attacks with.
pub const DEMO_WORDS: &[&str] = &[
    "access", "admin", "backdoor", "cipher", "daemon", "delta", "enigma", "falcon", "gateway",
    "ghost", "hunter", "kernel", "lambda", "matrix", "monitor", "nexus", "oracle", "phantom",
    "proxy", "quantum", "raven", "root", "sentinel", "shadow", "socket", "spectre", "system",
    "trinity", "uplink", "vector", "viper", "zero",
];

/// Build the mission, connect the player, and start every task.
///
/// Returns the target's hop id.
///
/// # Errors
///
/// Returns [`EngineError`] if a challenge cannot be generated, the route
/// cannot be built, or the machine refuses a task.
pub fn stage(session: &mut Session) -> Result<HopId, EngineError> {
    let mut relays: Vec<HopId> = (0..RELAY_COUNT)
        .map(|i| {
            let computer = Computer::new(format!("Public Access Server {i}"), HopKind::Public, session.rng_mut());
            let x = i32::try_from(i).unwrap_or(0).saturating_mul(15);
            session.network_mut().insert(computer.at(Point::new(x, x.saturating_div(2))))
        })
        .collect();
    relays.shuffle(session.rng_mut());

    let password = {
        let dictionary = session.dictionary().clone();
        Challenge::dictionary_password(PASSWORD_DIFFICULTY, &dictionary, session.rng_mut())?
    };
    let grid = Challenge::generate_encryption(EncryptionTier::Linear, session.rng_mut());
    let guards = [password.id(), grid.id()];
    info!(
        password = %password.name(),
        encryption = %grid.name(),
        encryption_difficulty = %grid.difficulty(),
        "mission challenges generated"
    );

    let server = Computer::new("Uplink Corporation Mainframe", HopKind::Mission, session.rng_mut())
        .at(Point::new(90, 40));
    let target = session.add_target(server, vec![password, grid], Decimal::from(MISSION_REWARD));

    let connection = session.route("Player Connection", &relays, target)?;
    session.connect(target, connection)?;
    for id in guards {
        let task = session.start_cracking(id)?;
        info!(task = %task, challenge = %id, "cracking started");
    }
    Ok(target)
}
