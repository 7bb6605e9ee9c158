use zeroize::{
    Zeroize,
    Zeroizing,
};

use crate::errors::VliError;
use crate::utils::shell::Executor;

/// Executes:
/// ```shell
/// ykchalresp -${{ slot }} -x ${{ challenge }}
/// ```
///
/// and returns the trimmed hex response as bytes. The token must be
/// configured for HMAC-SHA1 challenge-response in `slot`.
pub fn challenge_response(
    exec: &mut dyn Executor,
    slot: u8,
    challenge: &str,
) -> Result<Zeroizing<Vec<u8>>, VliError> {
    let slot = format!("-{slot}");
    let mut out = exec.output("ykchalresp", &[&slot, "-x", challenge])?;

    let response = Zeroizing::new(out.trim().as_bytes().to_vec());
    out.zeroize();

    if response.is_empty() {
        return Err(VliError::VliRsBug(
            "ykchalresp returned empty response".into(),
        ));
    }

    Ok(response)
}
