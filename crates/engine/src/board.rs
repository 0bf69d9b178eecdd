use std::fmt;

use serde::{Deserialize, Serialize};
use shared::domain::{Cell, Player, Position};

pub const ROWS: usize = 6;
pub const COLS: usize = 7;

/// Win scan axes in priority order: horizontal, vertical, down-right, down-left.
const AXES: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [[Cell; COLS]; ROWS],
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Board {
            cells: [[Cell::Empty; COLS]; ROWS],
        }
    }

    /// Cell at a position, `None` when off the board.
    /// Row 0 is the top, row 5 is the bottom
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn rows(&self) -> &[[Cell; COLS]; ROWS] {
        &self.cells
    }

    /// Check if a column is full. Columns off the board count as full.
    pub fn is_column_full(&self, col: usize) -> bool {
        if col >= COLS {
            return true;
        }
        !self.cells[0][col].is_empty()
    }

    /// Lowest empty row in a column, scanning from the bottom up.
    pub fn lowest_empty_row(&self, col: usize) -> Option<usize> {
        if col >= COLS {
            return None;
        }
        (0..ROWS).rev().find(|&row| self.cells[row][col].is_empty())
    }

    /// Drop a piece in a column, returns the row where it landed
    pub(crate) fn drop_piece(&mut self, col: usize, player: Player) -> Option<usize> {
        let row = self.lowest_empty_row(col)?;
        self.cells[row][col] = Cell::from(player);
        Some(row)
    }

    /// Every column has room until its top cell is taken, so a full top row
    /// means a full board.
    pub fn is_top_row_full(&self) -> bool {
        self.cells[0].iter().all(|cell| !cell.is_empty())
    }

    pub fn available_columns(&self) -> Vec<usize> {
        (0..COLS).filter(|&col| !self.is_column_full(col)).collect()
    }

    /// Line of four or more through the piece at (row, col), if any.
    ///
    /// Positions are ordered as found: the anchor, then the run in the axis'
    /// positive direction, then the run in the negative direction. Only the
    /// first winning axis is reported.
    pub fn winning_line(&self, row: usize, col: usize) -> Option<Vec<Position>> {
        let player = self.get(row, col)?.player()?;

        AXES.iter().find_map(|&(dr, dc)| {
            let mut line = vec![Position::new(row, col)];
            line.extend(self.run(row, col, dr, dc, player));
            line.extend(self.run(row, col, -dr, -dc, player));
            (line.len() >= 4).then_some(line)
        })
    }

    fn run(&self, row: usize, col: usize, dr: isize, dc: isize, player: Player) -> Vec<Position> {
        let target = Cell::from(player);
        let mut found = Vec::new();
        let mut r = row as isize + dr;
        let mut c = col as isize + dc;

        while let Some(cell) = self.cell_at(r, c) {
            if cell != target {
                break;
            }
            found.push(Position::new(r as usize, c as usize));
            r += dr;
            c += dc;
        }

        found
    }

    fn cell_at(&self, row: isize, col: isize) -> Option<Cell> {
        if row < 0 || col < 0 {
            return None;
        }
        self.get(row as usize, col as usize)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, row) in self.cells.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            let line = row
                .iter()
                .map(|cell| match cell {
                    Cell::Empty => ".",
                    Cell::Red => "R",
                    Cell::Yellow => "Y",
                })
                .collect::<Vec<_>>()
                .join(" ");
            f.write_str(&line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(board: &mut Board, moves: &[(usize, Player)]) {
        for &(col, player) in moves {
            board.drop_piece(col, player).expect("column has room");
        }
    }

    #[test]
    fn new_board_is_empty() {
        let board = Board::new();
        for row in 0..ROWS {
            for col in 0..COLS {
                assert_eq!(board.get(row, col), Some(Cell::Empty));
            }
        }
        assert_eq!(board.get(ROWS, 0), None);
        assert_eq!(board.get(0, COLS), None);
    }

    #[test]
    fn drop_piece_stacks_from_bottom() {
        let mut board = Board::new();

        assert_eq!(board.drop_piece(3, Player::Red), Some(5));
        assert_eq!(board.get(5, 3), Some(Cell::Red));

        assert_eq!(board.drop_piece(3, Player::Yellow), Some(4));
        assert_eq!(board.get(4, 3), Some(Cell::Yellow));
    }

    #[test]
    fn full_column_rejects_pieces() {
        let mut board = Board::new();
        for _ in 0..ROWS {
            board.drop_piece(0, Player::Red).expect("room");
        }

        assert!(board.is_column_full(0));
        assert_eq!(board.lowest_empty_row(0), None);
        assert_eq!(board.drop_piece(0, Player::Yellow), None);
        assert_eq!(board.available_columns(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn off_board_column_is_full() {
        let board = Board::new();
        assert!(board.is_column_full(COLS));
        assert_eq!(board.lowest_empty_row(COLS), None);
    }

    #[test]
    fn top_row_full_only_when_every_column_is_full() {
        let mut board = Board::new();
        for col in 0..COLS - 1 {
            for _ in 0..ROWS {
                board.drop_piece(col, Player::Red).expect("room");
            }
        }
        assert!(!board.is_top_row_full());

        for _ in 0..ROWS {
            board.drop_piece(COLS - 1, Player::Yellow).expect("room");
        }
        assert!(board.is_top_row_full());
    }

    #[test]
    fn horizontal_line_reports_anchor_then_positive_then_negative() {
        let mut board = Board::new();
        fill(
            &mut board,
            &[(0, Player::Red), (1, Player::Red), (3, Player::Red), (2, Player::Red)],
        );

        assert_eq!(
            board.winning_line(5, 2),
            Some(vec![
                Position::new(5, 2),
                Position::new(5, 3),
                Position::new(5, 1),
                Position::new(5, 0),
            ])
        );
    }

    #[test]
    fn vertical_line_is_detected() {
        let mut board = Board::new();
        fill(&mut board, &[(3, Player::Yellow); 4]);

        let line = board.winning_line(2, 3).expect("vertical win");
        assert_eq!(line.len(), 4);
        assert!(line.iter().all(|pos| pos.col == 3));
    }

    #[test]
    fn diagonal_down_right_line_is_detected() {
        let mut board = Board::new();
        fill(
            &mut board,
            &[
                (6, Player::Red),
                (5, Player::Yellow),
                (5, Player::Red),
                (4, Player::Yellow),
                (4, Player::Yellow),
                (4, Player::Red),
                (3, Player::Yellow),
                (3, Player::Yellow),
                (3, Player::Yellow),
                (3, Player::Red),
            ],
        );

        assert_eq!(
            board.winning_line(2, 3),
            Some(vec![
                Position::new(2, 3),
                Position::new(3, 4),
                Position::new(4, 5),
                Position::new(5, 6),
            ])
        );
    }

    #[test]
    fn diagonal_down_left_line_is_detected() {
        let mut board = Board::new();
        fill(
            &mut board,
            &[
                (0, Player::Red),
                (1, Player::Yellow),
                (1, Player::Red),
                (2, Player::Yellow),
                (2, Player::Yellow),
                (2, Player::Red),
                (3, Player::Yellow),
                (3, Player::Yellow),
                (3, Player::Yellow),
                (3, Player::Red),
            ],
        );

        assert_eq!(
            board.winning_line(2, 3),
            Some(vec![
                Position::new(2, 3),
                Position::new(3, 2),
                Position::new(4, 1),
                Position::new(5, 0),
            ])
        );
    }

    #[test]
    fn three_in_a_row_is_not_a_line() {
        let mut board = Board::new();
        fill(&mut board, &[(0, Player::Red), (1, Player::Red), (2, Player::Red)]);
        assert_eq!(board.winning_line(5, 1), None);
    }

    #[test]
    fn empty_cell_has_no_line() {
        let board = Board::new();
        assert_eq!(board.winning_line(5, 0), None);
    }

    #[test]
    fn display_renders_one_line_per_row() {
        let mut board = Board::new();
        fill(&mut board, &[(0, Player::Red), (6, Player::Yellow)]);

        let rendered = board.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), ROWS);
        assert_eq!(lines[0], ". . . . . . .");
        assert_eq!(lines[5], "R . . . . . Y");
    }
}
