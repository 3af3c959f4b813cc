use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use clap::{Parser, Subcommand};
use image::ImageReader;
use rgb::AsPixels;

use lpvc::ppm::Ppm;
use lpvc::{BitmapInfo, Color, Decoder, Encoder, EncoderSettings};

/// LPV container format:
/// - Magic: "LPVC" (4 bytes)
/// - Width: u32 LE
/// - Height: u32 LE
/// - Frame count: u32 LE
/// - Per frame: u32 LE payload length, then the encoded frame bytes
const MAGIC: &[u8; 4] = b"LPVC";

#[derive(Parser)]
#[command(name = "lpvc")]
#[command(about = "LPVC lossless palette-aware video codec", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a sequence of image frames (PPM or PNG) into an .lpv stream
    #[command(visible_alias = "e")]
    Encode {
        /// Input frames in presentation order
        #[arg(required = true)]
        frames: Vec<String>,
        /// Output .lpv file
        #[arg(short, long)]
        output: String,
        /// Disable the palette path; frames become raw or null blocks
        #[arg(long)]
        no_palette: bool,
        /// zstd compression level
        #[arg(long, default_value_t = 18)]
        level: i32,
        /// zstd worker threads, or "auto" for one per logical CPU
        #[arg(long, default_value = "1")]
        workers: String,
        /// Force a key frame every N frames (0 = first frame only)
        #[arg(long, default_value_t = 0)]
        key_frame_interval: usize,
    },
    /// Decode an .lpv stream into numbered PPM frames
    #[command(visible_alias = "d")]
    Decode {
        /// Input .lpv file
        input: String,
        /// Output prefix; frames are written as <prefix>NNNN.ppm
        prefix: String,
    },
}

fn load_rgb_frame(path: &str) -> Result<(u32, u32, Vec<Color>), Box<dyn std::error::Error>> {
    let path_lower = path.to_lowercase();

    if path_lower.ends_with(".ppm") {
        let ppm = Ppm::open(path)?;
        Ok((ppm.width(), ppm.height(), ppm.into_pixels()))
    } else {
        // Use the image crate for PNG and other formats
        let img = ImageReader::open(path)?.decode()?;
        let frame = img.to_rgb8();
        let (width, height) = frame.dimensions();
        let pixels: Vec<Color> = frame.into_raw().as_pixels().to_vec();
        Ok((width, height, pixels))
    }
}

fn parse_workers(workers: &str) -> Result<u32, Box<dyn std::error::Error>> {
    if workers == "auto" {
        Ok(num_cpus::get() as u32)
    } else {
        Ok(workers.parse::<u32>()?)
    }
}

fn encode(
    frames: &[String],
    output: &str,
    no_palette: bool,
    level: i32,
    workers: &str,
    key_frame_interval: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = EncoderSettings {
        use_palette: !no_palette,
        zstd_compression_level: level,
        zstd_worker_count: parse_workers(workers)?,
    };

    let (width, height, first_pixels) = load_rgb_frame(&frames[0])?;
    let info = BitmapInfo {
        width: width as usize,
        height: height as usize,
    };

    let mut encoder = Encoder::new(info, settings)?;
    let mut buffer = vec![0u8; encoder.safe_output_buffer_size()];

    let mut file = File::create(output)?;
    file.write_all(MAGIC)?;
    file.write_all(&width.to_le_bytes())?;
    file.write_all(&height.to_le_bytes())?;
    file.write_all(&(frames.len() as u32).to_le_bytes())?;

    let mut raw_total = 0usize;
    let mut encoded_total = 0usize;

    for (index, path) in frames.iter().enumerate() {
        let pixels = if index == 0 {
            first_pixels.clone()
        } else {
            let (frame_width, frame_height, pixels) = load_rgb_frame(path)?;
            if frame_width != width || frame_height != height {
                return Err(format!(
                    "Frame {path} is {frame_width}x{frame_height}, expected {width}x{height}"
                )
                .into());
            }
            pixels
        };

        let request_key_frame =
            key_frame_interval != 0 && index % key_frame_interval == 0;
        let result = encoder.encode(&pixels, &mut buffer, request_key_frame)?;

        file.write_all(&(result.bytes_written as u32).to_le_bytes())?;
        file.write_all(&buffer[..result.bytes_written])?;

        raw_total += pixels.len() * 3;
        encoded_total += result.bytes_written;
    }

    let ratio = encoded_total as f64 / raw_total as f64;
    println!(
        "Encoded {} frames: {} -> {} bytes ({:.1}x, {:.1}% smaller)",
        frames.len(),
        raw_total,
        encoded_total,
        1.0 / ratio,
        (1.0 - ratio) * 100.0
    );
    println!("Saved to: {output}");
    Ok(())
}

fn decode(input: &str, prefix: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(input).exists() {
        return Err(format!("Input file not found: {input}").into());
    }

    let mut file = File::open(input)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;

    if data.len() < 16 || &data[0..4] != MAGIC {
        return Err("Invalid LPV file (bad magic or truncated header)".into());
    }

    let width = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    let height = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);
    let frame_count = u32::from_le_bytes([data[12], data[13], data[14], data[15]]);

    println!("LPV container: {width}x{height}, {frame_count} frames");

    let info = BitmapInfo {
        width: width as usize,
        height: height as usize,
    };
    let mut decoder = Decoder::new(info)?;
    let mut pixels = vec![Color { r: 0, g: 0, b: 0 }; info.pixel_count()];

    let mut offset = 16usize;
    for index in 0..frame_count {
        if offset + 4 > data.len() {
            return Err(format!("Truncated container at frame {index}").into());
        }
        let frame_size = u32::from_le_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]) as usize;
        offset += 4;

        if offset + frame_size > data.len() {
            return Err(format!("Truncated frame {index}").into());
        }

        decoder.decode(&data[offset..offset + frame_size], &mut pixels)?;
        offset += frame_size;

        let path = format!("{prefix}{index:04}.ppm");
        Ppm::from_pixels(width, height, pixels.clone())?.save(&path, true)?;
    }

    println!("Wrote {frame_count} frames to {prefix}NNNN.ppm");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            frames,
            output,
            no_palette,
            level,
            workers,
            key_frame_interval,
        } => encode(
            &frames,
            &output,
            no_palette,
            level,
            &workers,
            key_frame_interval,
        )?,
        Commands::Decode { input, prefix } => decode(&input, &prefix)?,
    }

    Ok(())
}
