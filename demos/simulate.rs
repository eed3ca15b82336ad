//! Run a full AR session against synthetic collaborators.
//!
//! A fake camera, a scripted VO engine and a logging renderer stand in for
//! the host. The device slowly turns while the session switches through the
//! tracking modes and a pointer drags, pinches and double-taps the overlay.
//!
//! Usage: RUST_LOG=info cargo run --example simulate [sensor|slam|hybrid]

use arsticker::orientation::view_matrix_from_pose;
use arsticker::types::{Frame, FrameSize};
use arsticker::vo::{VoEngine, VoInitConfig, VoProvider};
use arsticker::{
    ArApp, ArConfig, CameraPose, CameraStream, FrameDescription, MediaFactory, MediaSource,
    OrientationEvent, OverlayMedia, Renderer, ScreenPoint, TextureHandle, TrackingMode,
    ViewEstimate,
};
use nalgebra::{UnitQuaternion, Vector3};
use std::time::{Duration, Instant};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

struct GradientCamera {
    size: FrameSize,
    frame: u32,
}

impl CameraStream for GradientCamera {
    fn frame_size(&self) -> Option<FrameSize> {
        Some(self.size)
    }

    fn read_frame(&mut self) -> Option<Frame> {
        self.frame += 1;
        let FrameSize { width, height } = self.size;
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = ((x + y + self.frame) % 256) as u8;
                pixels.extend_from_slice(&[v, v, v, 255]);
            }
        }
        Some(Frame {
            width,
            height,
            pixels,
        })
    }

    fn switch_camera(&mut self) -> arsticker::Result<()> {
        println!("camera: switched");
        Ok(())
    }

    fn stop(&mut self) {
        println!("camera: stopped");
    }
}

/// Walks the camera along a slow circle and loses tracking now and then.
struct ScriptedVo {
    frames: u32,
}

impl VoEngine for ScriptedVo {
    fn init(&mut self, config: &VoInitConfig) -> arsticker::Result<()> {
        std::thread::sleep(Duration::from_millis(30));
        println!(
            "vo: init fast_threshold={} max_features={}",
            config.fast_threshold, config.max_features
        );
        Ok(())
    }

    fn auto_configure_camera(&mut self, width: u32, height: u32) {
        println!("vo: intrinsics for {}x{}", width, height);
    }

    fn process_frame(&mut self, _width: u32, _height: u32, _pixels: &[u8]) -> Option<ViewEstimate> {
        self.frames += 1;
        let t = self.frames as f64 * 0.05;
        let pose = CameraPose {
            position: Vector3::new(0.3 * t.cos(), 0.0, 0.3 * t.sin()),
            orientation: UnitQuaternion::from_euler_angles(0.0, -t, 0.0),
        };
        Some(ViewEstimate {
            view_matrix: view_matrix_from_pose(&pose),
            tracking: self.frames % 40 < 30,
            feature_count: 180 + self.frames % 50,
        })
    }

    fn reset(&mut self) {
        self.frames = 0;
    }

    fn destroy(&mut self) {
        println!("vo: destroyed");
    }
}

struct ScriptedVoProvider;

impl VoProvider for ScriptedVoProvider {
    fn create(&self) -> Option<Box<dyn VoEngine>> {
        Some(Box::new(ScriptedVo { frames: 0 }))
    }
}

struct Clip {
    id: String,
    texture: TextureHandle,
}

impl OverlayMedia for Clip {
    fn texture(&self) -> TextureHandle {
        self.texture
    }

    fn natural_size(&self) -> Option<(u32, u32)> {
        Some((720, 1280))
    }

    fn play(&mut self) -> arsticker::Result<()> {
        Ok(())
    }

    fn pause(&mut self) {}

    fn refresh_texture(&mut self) {}

    fn release(&mut self) {
        println!("media: released {}", self.id);
    }
}

#[derive(Default)]
struct Clips {
    next_texture: u64,
}

impl MediaFactory for Clips {
    fn load(&mut self, source: &MediaSource) -> arsticker::Result<Box<dyn OverlayMedia>> {
        self.next_texture += 1;
        println!("media: loaded {}", source.id);
        Ok(Box::new(Clip {
            id: source.id.clone(),
            texture: TextureHandle(self.next_texture),
        }))
    }
}

#[derive(Default)]
struct PrintRenderer {
    frames: u64,
}

impl Renderer for PrintRenderer {
    fn render(&mut self, frame: &FrameDescription) {
        self.frames += 1;
        if self.frames % 30 != 1 {
            return;
        }
        let p = frame.camera.position;
        let (roll, pitch, yaw) = frame.camera.orientation.euler_angles();
        let overlay = frame
            .overlay
            .map(|o| {
                format!(
                    "overlay=({:+.3}, {:+.3}) x{:.2}",
                    o.transform.x, o.transform.y, o.transform.scale
                )
            })
            .unwrap_or_else(|| "overlay=none".into());
        println!(
            "frame {:>4}  pos=[{:+.3}, {:+.3}, {:+.3}]  rpy=[{:+6.1}, {:+6.1}, {:+6.1}]  {}",
            self.frames,
            p.x,
            p.y,
            p.z,
            roll.to_degrees(),
            pitch.to_degrees(),
            yaw.to_degrees(),
            overlay
        );
    }

    fn resize(&mut self, width: u32, height: u32) {
        println!("renderer: viewport {}x{}", width, height);
    }

    fn release(&mut self) {
        println!("renderer: released after {} frames", self.frames);
    }
}

fn main() {
    env_logger::init();

    let mut config = ArConfig::from_env();
    if let Some(arg) = std::env::args().nth(1) {
        match arg.parse::<TrackingMode>() {
            Ok(mode) => config.initial_mode = mode,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    }

    let mut now = Instant::now();
    let mut app = ArApp::builder(config, Box::<Clips>::default())
        .camera(Box::new(GradientCamera {
            size: FrameSize {
                width: 320,
                height: 240,
            },
            frame: 0,
        }))
        .renderer(Box::<PrintRenderer>::default())
        .vo_provider(Box::new(ScriptedVoProvider))
        .viewport(390, 844)
        .start(now);

    let script: [(u32, &str); 6] = [
        (60, "drag"),
        (90, "pinch"),
        (120, "hybrid"),
        (200, "double-tap"),
        (240, "switch-camera"),
        (300, "reset"),
    ];

    for tick in 0..360u32 {
        // Device held upright, turning left at ~9 deg/s.
        app.on_orientation(OrientationEvent::new(tick as f64 * 0.15, 90.0, 0.0));

        if let Some((_, action)) = script.iter().find(|(at, _)| *at == tick) {
            println!("--- {} ---", action);
            match *action {
                "drag" => {
                    app.on_pointer_down(&[ScreenPoint::new(195.0, 422.0)]);
                    app.on_pointer_move(&[ScreenPoint::new(255.0, 380.0)]);
                    app.on_pointer_up(&[], now);
                }
                "pinch" => {
                    let a = ScreenPoint::new(150.0, 400.0);
                    app.on_pointer_down(&[a, ScreenPoint::new(250.0, 400.0)]);
                    app.on_pointer_move(&[a, ScreenPoint::new(300.0, 400.0)]);
                    app.on_pointer_up(&[], now);
                }
                "hybrid" => {
                    if let Err(e) = app.set_tracking_mode(TrackingMode::Hybrid) {
                        eprintln!("hybrid unavailable: {}", e);
                    }
                }
                "double-tap" => {
                    let p = [ScreenPoint::new(195.0, 422.0)];
                    app.on_pointer_down(&p);
                    app.on_pointer_up(&[], now);
                    app.on_pointer_down(&p);
                    app.on_pointer_up(&[], now + Duration::from_millis(120));
                }
                "switch-camera" => {
                    if let Err(e) = app.switch_camera() {
                        eprintln!("switch failed: {}", e);
                    }
                }
                _ => app.reset_pose(),
            }
        }

        if !app.tick(now) {
            break;
        }
        if tick % 60 == 59 {
            let info = app.debug_info();
            println!(
                "debug: mode={} tracking={} features={}",
                info.mode, info.tracking, info.feature_count
            );
        }

        std::thread::sleep(FRAME_INTERVAL);
        now += FRAME_INTERVAL;
    }

    app.destroy();
}
