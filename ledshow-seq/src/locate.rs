//! Song file locator.
//!
//! A song is a base name resolved inside the music directory to a
//! pattern file (`<base>.txt`) and an audio file (`<base>.wav` or
//! `<base>.mp3`; WAV wins when both exist, since it is the hard
//! real-time path).

use crate::audio::source::AudioKind;
use crate::engine::SongInputs;
use crate::error::LoadError;
use std::path::Path;
use tracing::debug;

pub fn locate_song(music_dir: &Path, base: &str) -> Result<SongInputs, LoadError> {
    let pattern_path = music_dir.join(format!("{base}.txt"));
    let wav = music_dir.join(format!("{base}.wav"));
    let mp3 = music_dir.join(format!("{base}.mp3"));

    let (audio_path, kind) = if wav.is_file() {
        (wav, AudioKind::Wav)
    } else if mp3.is_file() {
        (mp3, AudioKind::Mp3)
    } else {
        return Err(LoadError::SongNotFound {
            base: base.to_string(),
            dir: music_dir.to_path_buf(),
        });
    };

    debug!(
        "located '{base}': audio {}, patterns {}",
        audio_path.display(),
        pattern_path.display()
    );

    Ok(SongInputs {
        base: base.to_string(),
        audio_path,
        kind,
        pattern_path,
    })
}
