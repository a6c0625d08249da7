use std::process::ExitCode;

#[macro_use]
extern crate log;

use argh::FromArgs;

use recovery_verify::{load_trusted_keys, LogProgress, Package};
use update_format_zip::whole_file::VerifyResult;

#[derive(FromArgs, Debug)]
/// Verify the signature of an update package against a set of trusted RSA
/// public keys.
struct Args {
    /// path to a public key PEM file.
    /// may be specified multiple times; any matching key accepts the package
    #[argh(option, short = 'k')]
    pubkey_file: Vec<String>,

    /// check the per-entry JAR-style signature chain instead of the
    /// whole-file signature
    #[argh(switch)]
    jar: bool,

    /// path to the update package
    #[argh(positional)]
    package: String,
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Args = argh::from_env();

    let keys = match load_trusted_keys(&args.pubkey_file) {
        Ok(keys) => keys,
        Err(err) => {
            error!("{err:#}");
            return ExitCode::from(1);
        }
    };

    let mut package = Package::new(&args.package);
    let mut progress = LogProgress::new();

    let verified = if args.jar {
        match package.verify_jar(&keys, &mut progress) {
            Ok(verified) => verified,
            Err(err) => {
                error!("{err:#}");
                false
            }
        }
    } else {
        package.verify_whole_file(&keys, &mut progress) == VerifyResult::Success
    };

    if verified {
        println!("{}: signature verified", args.package);
        ExitCode::SUCCESS
    } else {
        println!("{}: signature verification FAILED", args.package);
        ExitCode::from(1)
    }
}
