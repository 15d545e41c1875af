use crate::errors::AppResult;
use crate::models::WindowBounds;
use crate::windows::NoteSurface;
use tokio::time::{sleep, Duration};

const SHRINK_STEPS: u32 = 12;
const SHRINK_FRAME: Duration = Duration::from_millis(16);
const SHRINK_MIN_SIZE: u32 = 10;

/// Frames that collapse `start` into a 10x10 box at the bottom-right corner of `area`.
pub fn shrink_frames(start: WindowBounds, area: WindowBounds) -> Vec<WindowBounds> {
    let target = SHRINK_MIN_SIZE as f64;
    let end_x = area.x as f64 + area.width as f64 - target;
    let end_y = area.y as f64 + area.height as f64 - target;

    (1..=SHRINK_STEPS)
        .map(|step| {
            let t = step as f64 / SHRINK_STEPS as f64;
            let lerp = |from: f64, to: f64| (from + t * (to - from)).floor();
            WindowBounds {
                x: lerp(start.x as f64, end_x) as i32,
                y: lerp(start.y as f64, end_y) as i32,
                width: (lerp(start.width as f64, target) as u32).max(SHRINK_MIN_SIZE),
                height: (lerp(start.height as f64, target) as u32).max(SHRINK_MIN_SIZE),
            }
        })
        .collect()
}

pub async fn shrink_to_corner(surface: &dyn NoteSurface, area: WindowBounds) -> AppResult<()> {
    if surface.is_minimized()? {
        surface.restore()?;
    }
    let start = surface.bounds()?;
    for frame in shrink_frames(start, area) {
        surface.set_bounds(frame)?;
        sleep(SHRINK_FRAME).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::shrink_frames;
    use crate::models::WindowBounds;

    #[test]
    fn frames_end_in_the_corner_at_minimum_size() {
        let start = WindowBounds { x: 100, y: 50, width: 300, height: 400 };
        let area = WindowBounds { x: 0, y: 0, width: 1920, height: 1040 };
        let frames = shrink_frames(start, area);

        assert_eq!(frames.len(), 12);
        assert_eq!(frames[11], WindowBounds { x: 1910, y: 1030, width: 10, height: 10 });
        assert!(frames.windows(2).all(|pair| pair[1].width <= pair[0].width));
        assert!(frames.windows(2).all(|pair| pair[1].x >= pair[0].x));
    }

    #[test]
    fn small_windows_never_drop_below_minimum() {
        let start = WindowBounds { x: 0, y: 0, width: 8, height: 4 };
        let area = WindowBounds { x: -1280, y: 0, width: 1280, height: 720 };
        for frame in shrink_frames(start, area) {
            assert!(frame.width >= 10 && frame.height >= 10);
        }
    }
}
