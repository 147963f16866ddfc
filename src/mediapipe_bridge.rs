// src/mediapipe_bridge.rs - Hand landmarks from an external MediaPipe helper process
//
// The helper is any program that speaks JSON lines on stdin/stdout:
//   -> {"static_image_mode":false,"max_num_hands":2,"min_detection_confidence":0.7,"min_tracking_confidence":0.5}
//   -> {"width":640,"height":480,"format":"rgb8"} followed by width*height*3 raw bytes
//   <- {"hands":[{"handedness":"Left","score":0.97,"landmarks":[[x,y,z], ...]}]}
//   <- {"error":"..."}
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::hand::{DetectedHand, DetectorOptions, HandLandmarker, NormalizedLandmark, LANDMARK_COUNT};

#[derive(Serialize)]
struct FrameHeader<'a> {
    width: u32,
    height: u32,
    format: &'a str,
}

#[derive(Deserialize)]
struct Reply {
    #[serde(default)]
    hands: Vec<HandMessage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct HandMessage {
    #[serde(default)]
    handedness: Option<String>,
    #[serde(default)]
    score: f32,
    landmarks: Vec<[f32; 3]>,
}

fn decode_reply(line: &str) -> Result<Vec<DetectedHand>> {
    let reply: Reply = serde_json::from_str(line)?;

    if let Some(error) = reply.error {
        return Err(Error::Landmarker(error));
    }

    reply
        .hands
        .into_iter()
        .enumerate()
        .map(|(i, hand)| {
            if hand.landmarks.len() != LANDMARK_COUNT {
                return Err(Error::Landmarker(format!(
                    "hand {} has {} landmarks, expected {}",
                    i,
                    hand.landmarks.len(),
                    LANDMARK_COUNT
                )));
            }
            Ok(DetectedHand {
                landmarks: hand
                    .landmarks
                    .into_iter()
                    .map(|[x, y, z]| NormalizedLandmark::new(x, y, z))
                    .collect(),
                handedness: hand.handedness,
                score: hand.score,
            })
        })
        .collect()
}

pub struct MediaPipeWrapper {
    program: String,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    line: String,
    /// Set once the pipes break; the helper is not restarted.
    stopped: Option<String>,
}

impl MediaPipeWrapper {
    pub fn spawn(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::Config("landmarker command is empty".into()))?;

        info!("Starting hand landmarker: {}", command.join(" "));
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::Landmarker(format!("failed to start {}: {}", program, e)))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(Error::Landmarker(format!("{} has no stdio pipes", program)));
        };

        Ok(Self {
            program: program.clone(),
            child,
            stdin,
            stdout: BufReader::new(stdout),
            line: String::new(),
            stopped: None,
        })
    }

    fn send_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let header = FrameHeader {
            width: frame.width(),
            height: frame.height(),
            format: "rgb8",
        };
        serde_json::to_writer(&mut self.stdin, &header)?;
        self.stdin.write_all(b"\n")?;
        self.stdin.write_all(frame.as_raw())?;
        self.stdin.flush()?;
        Ok(())
    }

    fn read_reply(&mut self) -> Result<Vec<DetectedHand>> {
        self.line.clear();
        match self.stdout.read_line(&mut self.line) {
            Ok(0) => Err(self.stop("closed its output".to_string())),
            Ok(_) => decode_reply(self.line.trim_end()),
            Err(e) => Err(self.stop(e.to_string())),
        }
    }

    fn stop(&mut self, reason: String) -> Error {
        warn!("Hand landmarker {} stopped: {}", self.program, reason);
        let error = Error::Landmarker(format!("{} {}", self.program, reason));
        self.stopped = Some(reason);
        error
    }
}

impl HandLandmarker for MediaPipeWrapper {
    fn name(&self) -> &str {
        &self.program
    }

    fn configure(&mut self, options: &DetectorOptions) -> Result<()> {
        serde_json::to_writer(&mut self.stdin, options)?;
        self.stdin.write_all(b"\n")?;
        self.stdin.flush()?;
        debug!("Sent detector options to {}: {:?}", self.program, options);
        Ok(())
    }

    fn process(&mut self, frame: &RgbImage) -> Result<Vec<DetectedHand>> {
        if let Some(reason) = &self.stopped {
            return Err(Error::Landmarker(format!("{} is not running ({})", self.program, reason)));
        }
        if let Err(e) = self.send_frame(frame) {
            return Err(self.stop(format!("failed to send frame: {}", e)));
        }
        self.read_reply()
    }
}

impl Drop for MediaPipeWrapper {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            if self.stopped.is_none() {
                warn!("Failed to stop {}: {}", self.program, e);
            }
        }
        let _ = self.child.wait();
    }
}
