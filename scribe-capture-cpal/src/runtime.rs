//! Runtime identification for format negotiation.
//!
//! The desktop counterpart of a browser's user-agent string: the
//! negotiator inspects it to pick a recording container this runtime's
//! encoder can actually produce.

use cpal::traits::HostTrait;

/// Identity string of this capture runtime, e.g. `linux x86_64 (ALSA)`.
pub fn runtime_identity() -> String {
    let host = cpal::default_host();
    format!(
        "{} {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH,
        host.id().name()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_capture_core::negotiation::choose_recording_format;

    #[test]
    fn identity_names_the_platform() {
        let identity = runtime_identity();
        assert!(identity.contains(std::env::consts::OS));
        assert!(identity.contains('('));
    }

    #[test]
    fn desktop_identity_negotiates_the_preferred_container() {
        let format = choose_recording_format(&runtime_identity());
        assert!(!format.is_fallback);
    }
}
