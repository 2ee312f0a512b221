use crate::types::ExportTask;

const MAX_WIDTH: f64 = 80.0;
const MAX_HEIGHT: f64 = 24.0;

/// ASCII preview of export pieces on a `width` x `height` canvas.
///
/// Piece rectangles must be in the same unit as the canvas. Overlapping seams
/// show up as doubled edges.
pub fn render_layout(width: f64, height: f64, tasks: &[ExportTask]) -> String {
    if width <= 0.0 || height <= 0.0 {
        return String::new();
    }
    let scale = f64::min(MAX_WIDTH / width, MAX_HEIGHT / height);
    let grid_w = (width * scale).round() as usize;
    let grid_h = (height * scale).round() as usize;

    if grid_w == 0 || grid_h == 0 {
        return String::new();
    }

    let mut grid = vec![vec![' '; grid_w + 1]; grid_h + 1];

    draw_rect(&mut grid, 0, 0, grid_w, grid_h);

    for t in tasks {
        let sx = (t.rect.x1 * scale).round() as usize;
        let sy = (t.rect.y1 * scale).round() as usize;
        let sw = (t.rect.width() * scale).round() as usize;
        let sh = (t.rect.height() * scale).round() as usize;

        if sw == 0 || sh == 0 {
            continue;
        }

        draw_rect(&mut grid, sx, sy, sw, sh);

        let label: Vec<char> = (t.index + 1).to_string().chars().collect();
        if sw > 2 {
            let cx = sx + sw / 2;
            let cy = sy + sh / 2;
            let start_x = cx.saturating_sub(label.len() / 2);

            for (i, &ch) in label.iter().enumerate() {
                let x = start_x + i;
                if x > sx && x < sx + sw && cy > sy && cy < sy + sh {
                    grid[cy][x] = ch;
                }
            }
        }
    }

    let mut result = String::new();
    for row in &grid {
        let line: String = row.iter().collect();
        result.push_str(line.trim_end());
        result.push('\n');
    }
    result
}

fn edge(current: char, crossing: char, own: char) -> char {
    if current == crossing || current == '+' {
        '+'
    } else {
        own
    }
}

#[allow(clippy::needless_range_loop)]
fn draw_rect(grid: &mut [Vec<char>], x: usize, y: usize, w: usize, h: usize) {
    let rows = grid.len();
    let cols = if rows > 0 { grid[0].len() } else { return };

    for i in x..=x + w {
        if i < cols {
            if y < rows {
                grid[y][i] = edge(grid[y][i], '|', '-');
            }
            if y + h < rows {
                grid[y + h][i] = edge(grid[y + h][i], '|', '-');
            }
        }
    }

    for j in y..=y + h {
        if j < rows {
            if x < cols {
                grid[j][x] = edge(grid[j][x], '-', '|');
            }
            if x + w < cols {
                grid[j][x + w] = edge(grid[j][x + w], '-', '|');
            }
        }
    }

    for &cx in &[x, x + w] {
        for &cy in &[y, y + h] {
            if cy < rows && cx < cols {
                grid[cy][cx] = '+';
            }
        }
    }
}
