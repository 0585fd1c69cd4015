use rand::Rng;
use thiserror::Error;

use super::state::{Cell, Controller, Direction, Entity, Point, Snake, SnakeGrid};
use crate::game::traits::PlayerId;

pub const INITIAL_SNAKE_SIZE: usize = 2;

/// Broken preconditions. Reaching one means an invariant was already
/// violated upstream, so the owning match must stop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("no free cell pair left to place a snake")]
    BoardFull,
    #[error("no entity occupies {0:?}")]
    NoEntityAt(Point),
    #[error("no entity is controlled by player {0}")]
    UnknownPlayer(PlayerId),
    #[error("player {0} controls more than one entity")]
    DuplicatePlayer(PlayerId),
    #[error("no entity in slot {0}")]
    NoSuchEntity(usize),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MoveResult {
    pub ate_food: bool,
}

/// Builds a `width`×`height` board with `initial_bots` bots and one food cell.
pub fn new_game(
    width: u32,
    height: u32,
    initial_bots: usize,
    seed: Option<u64>,
) -> Result<SnakeGrid, GridError> {
    let mut grid = match seed {
        Some(seed) => SnakeGrid::with_seed(width, height, seed),
        None => SnakeGrid::new(width, height),
    };

    for _ in 0..initial_bots {
        add_snake(&mut grid, Controller::Bot)?;
    }

    place_food(&mut grid);

    Ok(grid)
}

/// Spawns a two-cell snake `[pos0, (pos0.x - 1, pos0.y)]` heading right.
///
/// `pos0` is drawn uniformly from every empty cell whose `x - 1` neighbour
/// is in bounds and empty. Returns the new slot.
pub fn add_snake(grid: &mut SnakeGrid, controller: Controller) -> Result<usize, GridError> {
    let candidates: Vec<Point> = grid
        .board
        .cells_with(Cell::Empty)
        .into_iter()
        .filter(|pos| grid.board.is_empty_at(&pos.offset(-1, 0)))
        .collect();

    if candidates.is_empty() {
        return Err(GridError::BoardFull);
    }

    let pos0 = candidates[grid.rng.random_range(0..candidates.len())];
    let body: Vec<Point> = (0..INITIAL_SNAKE_SIZE as i32)
        .map(|i| pos0.offset(-i, 0))
        .collect();

    for pos in &body {
        grid.board.set(pos, Cell::Snake);
    }

    grid.entities.push(Entity {
        controller,
        snake: Snake::new(body, Direction::Right),
    });

    let index = grid.entities.len() - 1;
    tracing::debug!("Spawned {} snake in slot {} at {:?}", controller, index, pos0);

    Ok(index)
}

/// Clears the snake's cells and drops its slot. Every later slot shifts
/// down by one, so indices held by callers are stale afterwards.
pub fn remove_snake(grid: &mut SnakeGrid, index: usize) -> Result<Entity, GridError> {
    if index >= grid.entities.len() {
        return Err(GridError::NoSuchEntity(index));
    }

    let entity = grid.entities.remove(index);
    for pos in &entity.snake.body {
        grid.board.set(pos, Cell::Empty);
    }

    Ok(entity)
}

/// Marks one uniformly chosen empty cell as food. A full board leaves the
/// grid without food.
pub fn place_food(grid: &mut SnakeGrid) -> Option<Point> {
    let free = grid.board.cells_with(Cell::Empty);
    if free.is_empty() {
        tracing::trace!("Board full, no food placed");
        grid.has_food = false;
        grid.food = None;
        return None;
    }

    let pos = free[grid.rng.random_range(0..free.len())];
    grid.board.set(&pos, Cell::Food);
    grid.has_food = true;
    grid.food = Some(pos);

    Some(pos)
}

/// Legal iff the new head is in bounds, not on a snake cell, and the turn
/// is not an exact reversal.
pub fn can_change_direction(grid: &SnakeGrid, index: usize, direction: Direction) -> bool {
    let Some(snake) = grid.snake(index) else {
        return false;
    };

    let head = snake.head().moved(direction);
    if !grid.board.in_bounds(&head) {
        return false;
    }

    if grid.board.get(&head) == Some(Cell::Snake) {
        return false;
    }

    !snake.direction.is_opposite(&direction)
}

/// Raw-vector front door: anything but a unit axis vector is rejected
/// before the legality check. Returns the typed direction when legal.
pub fn validate_direction(grid: &SnakeGrid, index: usize, x: i32, y: i32) -> Option<Direction> {
    Direction::from_vector(x, y).filter(|&dir| can_change_direction(grid, index, dir))
}

/// Advances the snake one cell along its current direction.
///
/// Legality is not rechecked here; callers validate first.
pub fn move_snake(grid: &mut SnakeGrid, index: usize) -> Result<MoveResult, GridError> {
    let snake = grid.snake(index).ok_or(GridError::NoSuchEntity(index))?;
    let new_head = snake.head().moved(snake.direction);

    if grid.board.get(&new_head) == Some(Cell::Food) {
        grid.board.set(&new_head, Cell::Snake);
        if let Some(snake) = grid.snake_mut(index) {
            snake.body.push_front(new_head);
        }
        grid.has_food = false;
        grid.food = None;
        place_food(grid);

        return Ok(MoveResult { ate_food: true });
    }

    let mut vacated = None;
    if let Some(snake) = grid.snake_mut(index) {
        vacated = snake.body.pop_back();
        snake.body.push_front(new_head);
    }
    if let Some(tail) = vacated {
        grid.board.set(&tail, Cell::Empty);
    }
    grid.board.set(&new_head, Cell::Snake);

    Ok(MoveResult { ate_food: false })
}

/// All legal directions; empty means the snake is stuck.
pub fn valid_directions(grid: &SnakeGrid, index: usize) -> Vec<Direction> {
    Direction::ALL
        .into_iter()
        .filter(|&dir| can_change_direction(grid, index, dir))
        .collect()
}

pub fn entity_index_at(grid: &SnakeGrid, pos: &Point) -> Result<usize, GridError> {
    grid.entities
        .iter()
        .position(|e| e.snake.occupies(pos))
        .ok_or(GridError::NoEntityAt(*pos))
}

/// Linear scan for the single slot steered by `player_id`.
pub fn index_of_player(grid: &SnakeGrid, player_id: PlayerId) -> Result<usize, GridError> {
    let mut matches = grid
        .entities
        .iter()
        .enumerate()
        .filter(|(_, e)| e.controller == Controller::Human(player_id))
        .map(|(i, _)| i);

    let index = matches.next().ok_or(GridError::UnknownPlayer(player_id))?;
    if matches.next().is_some() {
        return Err(GridError::DuplicatePlayer(player_id));
    }

    Ok(index)
}
