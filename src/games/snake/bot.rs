use rand::Rng;

use super::state::{Direction, SnakeGrid};
use super::systems;

/// Uniform pick among equally legal directions.
pub fn pick_direction<R: Rng + ?Sized>(candidates: &[Direction], rng: &mut R) -> Option<Direction> {
    if candidates.is_empty() {
        return None;
    }
    Some(candidates[rng.random_range(0..candidates.len())])
}

/// Points the bot in `index` at a random legal direction. A stuck bot keeps
/// its heading and yields `None`.
pub fn steer(grid: &mut SnakeGrid, index: usize) -> Option<Direction> {
    let candidates = systems::valid_directions(grid, index);
    let choice = pick_direction(&candidates, grid.rng_mut())?;

    if let Some(snake) = grid.snake_mut(index) {
        snake.direction = choice;
    }

    Some(choice)
}

/// Steers every bot-controlled entity for the next tick.
pub fn steer_bots(grid: &mut SnakeGrid) {
    for index in 0..grid.len() {
        if grid.controller(index).is_some_and(|c| c.is_bot()) {
            let choice = steer(grid, index);
            tracing::trace!("Bot in slot {} steers {:?}", index, choice);
        }
    }
}
