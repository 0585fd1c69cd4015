use std::collections::VecDeque;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::game::traits::PlayerId;

/// A cell coordinate.
///
/// Boards are addressed `[x][y]`. Rendered row by row over `y`, a `+y`
/// step reads as "right" and a `+x` step as "down".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn moved(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.offset(dx, dy)
    }
}

impl std::ops::Add for Point {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        self.offset(other.x, other.y)
    }
}

/// One of the four unit axis vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Right,
    Down,
    Left,
    Up,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Right,
        Direction::Down,
        Direction::Left,
        Direction::Up,
    ];

    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Right => (0, 1),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Up => (-1, 0),
        }
    }

    /// Accepts exactly the four unit axis vectors.
    pub fn from_vector(x: i32, y: i32) -> Option<Direction> {
        match (x, y) {
            (0, 1) => Some(Direction::Right),
            (1, 0) => Some(Direction::Down),
            (0, -1) => Some(Direction::Left),
            (-1, 0) => Some(Direction::Up),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Point {
        let (x, y) = self.delta();
        Point::new(x, y)
    }

    /// Exact reversal: the two vectors sum to zero.
    ///
    /// Only sound while every direction is a unit axis vector.
    pub fn is_opposite(&self, other: &Direction) -> bool {
        let (ax, ay) = self.delta();
        let (bx, by) = other.delta();
        ax + bx == 0 && ay + by == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Snake,
    Food,
}

/// W×H occupancy grid.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
}

impl Board {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::Empty; (width * height) as usize],
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn in_bounds(&self, pos: &Point) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    fn pos_to_index(&self, pos: &Point) -> Option<usize> {
        if self.in_bounds(pos) {
            Some((pos.x as u32 * self.height + pos.y as u32) as usize)
        } else {
            None
        }
    }

    pub fn get(&self, pos: &Point) -> Option<Cell> {
        self.pos_to_index(pos).map(|idx| self.cells[idx])
    }

    pub fn is_empty_at(&self, pos: &Point) -> bool {
        self.get(pos) == Some(Cell::Empty)
    }

    pub fn set(&mut self, pos: &Point, cell: Cell) {
        if let Some(idx) = self.pos_to_index(pos) {
            self.cells[idx] = cell;
        }
    }

    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|&&c| c == cell).count()
    }

    /// Every cell holding `cell`, column-major (`x` outer, `y` inner).
    pub fn cells_with(&self, cell: Cell) -> Vec<Point> {
        let mut found = Vec::new();
        for x in 0..self.width as i32 {
            for y in 0..self.height as i32 {
                let pos = Point::new(x, y);
                if self.get(&pos) == Some(cell) {
                    found.push(pos);
                }
            }
        }
        found
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("occupied", &self.count(Cell::Snake))
            .field("food", &self.count(Cell::Food))
            .finish()
    }
}

/// Who steers an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Controller {
    Bot,
    Human(PlayerId),
}

impl Controller {
    pub fn is_bot(&self) -> bool {
        matches!(self, Controller::Bot)
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            Controller::Bot => None,
            Controller::Human(id) => Some(*id),
        }
    }
}

impl fmt::Display for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Controller::Bot => write!(f, "bot"),
            Controller::Human(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snake {
    /// Head first, tail last
    pub body: VecDeque<Point>,
    pub direction: Direction,
}

impl Snake {
    pub fn new(body: impl IntoIterator<Item = Point>, direction: Direction) -> Self {
        Self {
            body: body.into_iter().collect(),
            direction,
        }
    }

    pub fn head(&self) -> Point {
        self.body[0]
    }

    pub fn tail(&self) -> Option<Point> {
        self.body.back().copied()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn occupies(&self, pos: &Point) -> bool {
        self.body.contains(pos)
    }
}

/// One arena slot: a snake and the identity steering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub controller: Controller,
    pub snake: Snake,
}

/// The whole simulated world of one match.
#[derive(Clone)]
pub struct SnakeGrid {
    pub board: Board,
    /// Insertion ordered; an index is only valid until the next removal
    pub entities: Vec<Entity>,
    pub has_food: bool,
    pub food: Option<Point>,
    pub(crate) rng: StdRng,
}

impl SnakeGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_seed(width, height, rand::rng().random())
    }

    pub fn with_seed(width: u32, height: u32, seed: u64) -> Self {
        Self {
            board: Board::new(width, height),
            entities: Vec::new(),
            has_food: false,
            food: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn width(&self) -> u32 {
        self.board.dimensions().0
    }

    pub fn height(&self) -> u32 {
        self.board.dimensions().1
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn snake(&self, index: usize) -> Option<&Snake> {
        self.entities.get(index).map(|e| &e.snake)
    }

    pub fn snake_mut(&mut self, index: usize) -> Option<&mut Snake> {
        self.entities.get_mut(index).map(|e| &mut e.snake)
    }

    pub fn controller(&self, index: usize) -> Option<Controller> {
        self.entities.get(index).map(|e| e.controller)
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

impl fmt::Debug for SnakeGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnakeGrid")
            .field("board", &self.board)
            .field("entities", &self.entities.len())
            .field("has_food", &self.has_food)
            .finish()
    }
}

/// Text dump of the board: `.` empty, `O` food, 1-based slot for snakes.
impl fmt::Display for SnakeGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height() as i32 {
            for x in 0..self.width() as i32 {
                let pos = Point::new(x, y);
                match self.board.get(&pos) {
                    Some(Cell::Snake) => {
                        let slot = self
                            .entities
                            .iter()
                            .position(|e| e.snake.occupies(&pos))
                            .map(|i| (i + 1).to_string())
                            .unwrap_or_else(|| "?".to_string());
                        write!(f, "{} ", slot)?;
                    }
                    Some(Cell::Food) => write!(f, "O ")?,
                    _ => write!(f, ". ")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_operations() {
        let pos = Point::new(5, 5);
        assert_eq!(pos.offset(1, -1), Point::new(6, 4));
        assert_eq!(pos.moved(Direction::Right), Point::new(5, 6));
        assert_eq!(pos.moved(Direction::Up), Point::new(4, 5));
        assert_eq!(pos + Point::new(-1, 0), Point::new(4, 5));
    }

    #[test]
    fn test_direction_vectors() {
        assert_eq!(Direction::Right.delta(), (0, 1));
        assert_eq!(Direction::Down.delta(), (1, 0));
        assert_eq!(Direction::Left.delta(), (0, -1));
        assert_eq!(Direction::Up.delta(), (-1, 0));
        for dir in Direction::ALL {
            let (x, y) = dir.delta();
            assert_eq!(Direction::from_vector(x, y), Some(dir));
        }
    }

    #[test]
    fn test_from_vector_rejects_non_units() {
        assert_eq!(Direction::from_vector(0, 0), None);
        assert_eq!(Direction::from_vector(1, 1), None);
        assert_eq!(Direction::from_vector(-1, 1), None);
        assert_eq!(Direction::from_vector(0, 2), None);
        assert_eq!(Direction::from_vector(-3, 0), None);
    }

    #[test]
    fn test_direction_opposite() {
        assert!(Direction::Right.is_opposite(&Direction::Left));
        assert!(Direction::Up.is_opposite(&Direction::Down));
        assert!(!Direction::Right.is_opposite(&Direction::Up));
        assert!(!Direction::Right.is_opposite(&Direction::Right));
    }

    #[test]
    fn test_board_bounds_and_cells() {
        let mut board = Board::new(10, 4);
        assert!(board.in_bounds(&Point::new(9, 3)));
        assert!(!board.in_bounds(&Point::new(10, 0)));
        assert!(!board.in_bounds(&Point::new(0, 4)));
        assert!(!board.in_bounds(&Point::new(-1, 0)));

        board.set(&Point::new(2, 3), Cell::Food);
        assert_eq!(board.get(&Point::new(2, 3)), Some(Cell::Food));
        assert_eq!(board.get(&Point::new(20, 3)), None);
        assert_eq!(board.count(Cell::Food), 1);
        assert_eq!(board.count(Cell::Empty), 39);

        // out of bounds writes are ignored
        board.set(&Point::new(-1, -1), Cell::Snake);
        assert_eq!(board.count(Cell::Snake), 0);
    }

    #[test]
    fn test_cells_with_order() {
        let mut board = Board::new(2, 2);
        board.set(&Point::new(0, 0), Cell::Snake);
        assert_eq!(
            board.cells_with(Cell::Empty),
            vec![Point::new(0, 1), Point::new(1, 0), Point::new(1, 1)]
        );
    }

    #[test]
    fn test_controller_display() {
        assert_eq!(Controller::Bot.to_string(), "bot");
        assert_eq!(Controller::Human(7).to_string(), "7");
        assert!(Controller::Bot.is_bot());
        assert_eq!(Controller::Human(7).player_id(), Some(7));
    }

    #[test]
    fn test_snake_accessors() {
        let snake = Snake::new([Point::new(5, 5), Point::new(4, 5)], Direction::Right);
        assert_eq!(snake.head(), Point::new(5, 5));
        assert_eq!(snake.tail(), Some(Point::new(4, 5)));
        assert_eq!(snake.len(), 2);
        assert!(snake.occupies(&Point::new(4, 5)));
        assert!(!snake.occupies(&Point::new(5, 6)));
    }

    #[test]
    fn test_display_renders_board() {
        let mut grid = SnakeGrid::with_seed(3, 2, 1);
        grid.board.set(&Point::new(1, 0), Cell::Snake);
        grid.board.set(&Point::new(2, 1), Cell::Food);
        grid.entities.push(Entity {
            controller: Controller::Bot,
            snake: Snake::new([Point::new(1, 0)], Direction::Right),
        });

        assert_eq!(grid.to_string(), ". 1 . \n. . O \n");
    }
}
