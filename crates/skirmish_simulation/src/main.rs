//! Headless skirmish
//!
//! Игрок против кольца врагов без рендера. Опционально: путь к TOML конфигу
//! первым аргументом, seed вторым.

use skirmish_simulation::logger::{log_error, log_info};
use skirmish_simulation::scenario::spawn_skirmish;
use skirmish_simulation::{create_headless_simulation, Action, CircleCollisionOracle, FrameServices, ScriptedInput, SimError, Simulation};

const FRAME: f32 = 1.0 / 60.0;
const TICKS: usize = 1800;

fn run() -> Result<(), SimError> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next();
    let seed = args.next().and_then(|value| value.parse().ok()).unwrap_or(42);

    let mut sim = match config_path {
        Some(path) => {
            skirmish_simulation::logger::init_logger();
            Simulation::from_config_file(path, seed)?
        }
        None => create_headless_simulation(seed),
    };
    let skirmish = spawn_skirmish(&mut sim, 3, 3.5)?;

    let mut input = ScriptedInput::new();
    let collision = CircleCollisionOracle;

    for tick in 0..TICKS {
        input.release_all();
        if tick % 20 == 0 {
            input.press(Action::Attack);
        }
        sim.update(FRAME, &FrameServices::new(&input, &collision));

        if tick % 300 == 0 {
            let alive = skirmish
                .enemies
                .iter()
                .filter(|enemy| sim.health_of(**enemy).is_some_and(|health| health > 0))
                .count();
            log_info(&format!(
                "Tick {}: player {:?} hp {:?}, enemies alive {}",
                tick,
                sim.state_of(skirmish.player),
                sim.health_of(skirmish.player),
                alive
            ));
        }
    }

    log_info("Simulation complete!");
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        log_error(&format!("Headless skirmish failed: {}", error));
        std::process::exit(1);
    }
}
