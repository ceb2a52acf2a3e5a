//! Recording-container negotiation.
//!
//! Not every runtime's encoder produces every container: WebKit-derived
//! engines cannot record WebM and need the MP4 fallback. Skipping this
//! negotiation produces recordings that silently fail to play on those
//! runtimes, so the container is chosen up front from the runtime's
//! identity string and fixed for the whole session.

use crate::models::format::RecordingFormat;

/// Choose the recording container for a runtime.
///
/// Pure and deterministic: the same identity string always yields the
/// same format. A runtime is treated as WebKit-derived when its identity
/// carries the Safari marker without any of the competing Chrome/Android
/// markers (those engines advertise Safari compatibility but encode WebM
/// fine).
pub fn choose_recording_format(runtime_identity: &str) -> RecordingFormat {
    if is_webkit_derived(runtime_identity) {
        RecordingFormat::fallback()
    } else {
        RecordingFormat::preferred()
    }
}

fn is_webkit_derived(runtime_identity: &str) -> bool {
    let id = runtime_identity.to_ascii_lowercase();
    id.contains("safari") && !id.contains("chrome") && !id.contains("android")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format::{MP4_MIME, WEBM_MIME};

    const SAFARI_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
         AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15";
    const CHROME_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const ANDROID_UA: &str = "Mozilla/5.0 (Linux; Android 14) AppleWebKit/537.36 \
         (KHTML, like Gecko) Version/4.0 Safari/537.36 Android";

    #[test]
    fn webkit_runtime_gets_the_fallback_container() {
        let format = choose_recording_format(SAFARI_UA);
        assert_eq!(format.container_mime, MP4_MIME);
        assert!(format.is_fallback);
    }

    #[test]
    fn chrome_style_runtime_gets_the_preferred_container() {
        let format = choose_recording_format(CHROME_UA);
        assert_eq!(format.container_mime, WEBM_MIME);
        assert!(!format.is_fallback);
    }

    #[test]
    fn android_marker_excludes_the_fallback() {
        assert_eq!(
            choose_recording_format(ANDROID_UA).container_mime,
            WEBM_MIME
        );
    }

    #[test]
    fn desktop_backend_identity_gets_the_preferred_container() {
        let format = choose_recording_format("linux x86_64 (ALSA)");
        assert_eq!(format.container_mime, WEBM_MIME);
        assert!(!format.is_fallback);
    }

    #[test]
    fn marker_matching_is_case_insensitive() {
        assert!(choose_recording_format("SAFARI/605").is_fallback);
    }

    #[test]
    fn choice_is_deterministic() {
        for identity in [SAFARI_UA, CHROME_UA, ANDROID_UA, ""] {
            assert_eq!(
                choose_recording_format(identity),
                choose_recording_format(identity)
            );
        }
    }
}
