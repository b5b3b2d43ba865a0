//! cam2fb binary: render camera frames to a framebuffer, decoding QR codes.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cam2fb::{LinearFramebuffer, LinuxFramebuffer, RenderLoop, RqrrDecoder, V4l2Camera};

/// Render live camera frames into a Linux framebuffer device while scanning
/// each frame for a QR code. Decoded strings are printed to stdout, one line
/// per frame (empty when nothing decoded).
#[derive(Debug, Parser)]
#[command(name = "cam2fb", version)]
struct Args {
    /// V4L2 camera index (/dev/video<N>)
    #[arg(long, default_value_t = 0)]
    camera: u32,

    /// Framebuffer device path
    #[arg(long, default_value = "/dev/fb0")]
    framebuffer: PathBuf,

    /// Requested capture width (best-effort)
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Requested capture height (best-effort)
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Requested capture rate (best-effort)
    #[arg(long, default_value_t = 10)]
    fps: u32,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(&Args::parse()) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let framebuffer = LinuxFramebuffer::open(&args.framebuffer)
        .with_context(|| format!("opening framebuffer {}", args.framebuffer.display()))?;
    let geometry = framebuffer.geometry();
    info!(
        virtual_width = geometry.virtual_width,
        bits_per_pixel = geometry.bits_per_pixel,
        "framebuffer ready"
    );
    if !geometry.is_supported() {
        warn!(
            bits_per_pixel = geometry.bits_per_pixel,
            "framebuffer depth has no conversion path; frames will be skipped"
        );
    }

    let mut camera = V4l2Camera::open(args.camera)
        .with_context(|| format!("opening camera /dev/video{}", args.camera))?;
    info!(
        driver = %camera.info().driver,
        card = %camera.info().card,
        "video device opened"
    );

    let format = camera
        .configure(args.width, args.height, args.fps)
        .context("configuring capture format")?;
    info!(
        width = format.width,
        height = format.height,
        fourcc = %format.fourcc,
        "capture format in effect"
    );

    let source = camera.stream(4).context("starting capture stream")?;

    let stdout = std::io::stdout().lock();
    let mut render = RenderLoop::new(source, RqrrDecoder, framebuffer, LineFlusher(stdout));
    render.run();
    Ok(())
}

/// Observer wrapper flushing after every line so decodes appear immediately
/// even when stdout is a pipe.
struct LineFlusher<W: Write>(W);

impl<W: Write> Write for LineFlusher<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }

    fn write_fmt(&mut self, fmt: std::fmt::Arguments<'_>) -> std::io::Result<()> {
        self.0.write_fmt(fmt)?;
        self.0.flush()
    }
}
