//! A synthetic remote desktop.
//!
//! Stands in for a real protocol client: it paints a gradient desktop with a
//! bouncing square, draws a dot wherever the left button is held, rings the
//! bell on `b` and publishes clipboard text on `c`. Events go out as
//! [`SessionEvent`]s, input comes back as [`SessionCommand`]s.

use anyhow::Result;
use bytes::Bytes;
use rfb_common::{Point, Rect};
use rfb_pixelbuffer::{PixelBuffer, BYTES_PER_PIXEL};
use rfb_session::{SessionCommand, SessionEvent};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

const SQUARE_SIZE: u32 = 48;
const SQUARE_COLOR: [u8; 4] = [250, 200, 40, 255];
const INK_COLOR: [u8; 4] = [255, 255, 255, 255];
const INK_SIZE: u32 = 3;

/// Demo desktop settings.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub width: u32,
    pub height: u32,
    pub name: String,
    /// Time between animation steps.
    pub frame_interval: Duration,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            name: "demo desktop".to_string(),
            frame_interval: Duration::from_millis(50),
        }
    }
}

/// The desktop image and animation state.
pub struct DemoDesktop {
    image: PixelBuffer,
    tick: u64,
    square: Rect,
}

impl DemoDesktop {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let mut desktop = Self {
            image: PixelBuffer::new(width, height),
            tick: 0,
            square: Rect::new(0, 0, 0, 0),
        };
        desktop.paint_background(desktop.image.bounds())?;
        Ok(desktop)
    }

    pub fn image(&self) -> &PixelBuffer {
        &self.image
    }

    fn background_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let w = self.image.width().max(1);
        let h = self.image.height().max(1);
        [(x * 255 / w) as u8, (y * 255 / h) as u8, 96, 255]
    }

    fn paint_background(&mut self, rect: Rect) -> Result<()> {
        let mut pixels = Vec::with_capacity(rect.area() as usize * BYTES_PER_PIXEL);
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                pixels.extend_from_slice(&self.background_pixel(x as u32, y as u32));
            }
        }
        self.image.image_rect(rect, &pixels, 0)
    }

    fn patch(&self, rect: Rect) -> Result<SessionEvent> {
        let pixels = self.image.crop(rect)?.into_raw();
        Ok(SessionEvent::FrameUpdate {
            rect,
            pixels: Bytes::from(pixels),
        })
    }

    /// Events announcing the desktop: `Connected` then one full frame.
    pub fn connect(&self, name: &str) -> Result<Vec<SessionEvent>> {
        let (width, height) = self.image.dimensions();
        Ok(vec![
            SessionEvent::Connected {
                width,
                height,
                name: name.to_string(),
            },
            self.patch(self.image.bounds())?,
        ])
    }

    /// Advance the animation by one step and return the changed area.
    pub fn step(&mut self) -> Result<Option<SessionEvent>> {
        let (w, h) = self.image.dimensions();
        if w < SQUARE_SIZE || h < SQUARE_SIZE {
            return Ok(None);
        }
        self.tick += 1;
        let next = Rect::new(
            bounce(self.tick * 4, w - SQUARE_SIZE),
            bounce(self.tick * 3, h - SQUARE_SIZE),
            SQUARE_SIZE,
            SQUARE_SIZE,
        );
        let previous = self.square;
        if !previous.is_empty() {
            self.paint_background(previous)?;
        }
        self.image.fill_rect(next, SQUARE_COLOR)?;
        self.square = next;

        let damaged = previous.union(&next);
        trace!("Demo step {} damaged {:?}", self.tick, damaged);
        self.patch(damaged).map(Some)
    }

    /// React to viewer input.
    pub fn apply(&mut self, command: &SessionCommand) -> Result<Vec<SessionEvent>> {
        match *command {
            SessionCommand::Pointer { x, y, buttons } if buttons & 1 != 0 => {
                let (w, h) = self.image.dimensions();
                let centre = Point::new(i32::from(x), i32::from(y));
                let dot = Rect::new(centre.x - 1, centre.y - 1, INK_SIZE, INK_SIZE);
                match dot.clamp_to(w, h) {
                    Some(dot) => {
                        self.image.fill_rect(dot, INK_COLOR)?;
                        Ok(vec![self.patch(dot)?])
                    }
                    None => Ok(Vec::new()),
                }
            }
            SessionCommand::Key { keysym, down: true } if keysym == 'b' as u32 => {
                Ok(vec![SessionEvent::Bell])
            }
            SessionCommand::Key { keysym, down: true } if keysym == 'c' as u32 => {
                Ok(vec![SessionEvent::Clipboard {
                    text: format!("demo clipboard at tick {}", self.tick),
                }])
            }
            SessionCommand::Close => Ok(vec![SessionEvent::Disconnected]),
            _ => Ok(Vec::new()),
        }
    }
}

/// Triangle wave over `0..=max`.
fn bounce(t: u64, max: u32) -> i32 {
    if max == 0 {
        return 0;
    }
    let period = 2 * u64::from(max);
    let phase = t % period;
    let v = if phase <= u64::from(max) {
        phase
    } else {
        period - phase
    };
    v as i32
}

/// Run the demo desktop on the current tokio runtime.
///
/// Stops after `SessionCommand::Close`, or when either channel closes.
pub fn spawn(
    config: DemoConfig,
    events: flume::Sender<SessionEvent>,
    commands: flume::Receiver<SessionCommand>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = run(config, &events, &commands).await {
            warn!("Demo session failed: {}", e);
            let _ = events.send(SessionEvent::IoError {
                message: e.to_string(),
            });
            let _ = events.send(SessionEvent::Disconnected);
        }
        debug!("Demo session stopped");
    })
}

async fn run(
    config: DemoConfig,
    events: &flume::Sender<SessionEvent>,
    commands: &flume::Receiver<SessionCommand>,
) -> Result<()> {
    let mut desktop = DemoDesktop::new(config.width, config.height)?;
    info!(
        "Demo session {:?} started ({}x{})",
        config.name, config.width, config.height
    );
    for event in desktop.connect(&config.name)? {
        events.send(event)?;
    }

    let mut ticker = tokio::time::interval(config.frame_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(event) = desktop.step()? {
                    events.send(event)?;
                }
            }
            command = commands.recv_async() => {
                let command = match command {
                    Ok(c) => c,
                    Err(_) => {
                        debug!("Command channel closed");
                        events.send(SessionEvent::Disconnected)?;
                        return Ok(());
                    }
                };
                let close = command == SessionCommand::Close;
                for event in desktop.apply(&command)? {
                    events.send(event)?;
                }
                if close {
                    info!("Demo session closed by viewer");
                    return Ok(());
                }
            }
        }
    }
}
