use anyhow::{Context, Result, bail};
use log::{debug, info};

use update_format_zip::verify_sig::{get_public_key_pkcs_pem, KeyType, TrustedKey};

/// Load one trusted public key per PEM path. Keys provisioned on devices
/// come in both PKCS8 SPKI and PKCS1 encodings, so try both.
pub fn load_trusted_keys(paths: &[String]) -> Result<Vec<TrustedKey>> {
    if paths.is_empty() {
        bail!("no public key files given");
    }

    let mut keys = Vec::with_capacity(paths.len());
    for path in paths {
        let public_key = match get_public_key_pkcs_pem(path, KeyType::KeyTypePkcs8) {
            Ok(key) => {
                debug!("loaded PKCS8 public key from {path}");
                key
            }
            Err(pkcs8_err) => {
                let key = get_public_key_pkcs_pem(path, KeyType::KeyTypePkcs1).context(format!("failed to load public key ({path:?}, tried PKCS8 first: {pkcs8_err})"))?;
                debug!("loaded PKCS1 public key from {path}");
                key
            }
        };

        keys.push(TrustedKey::new(public_key).context(format!("unusable public key ({path:?})"))?);
    }

    info!("loaded {} trusted public key(s)", keys.len());
    Ok(keys)
}
