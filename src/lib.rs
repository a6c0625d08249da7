mod keys;
pub use keys::load_trusted_keys;

mod package;
pub use package::Package;
pub use package::PackageStatus;

mod progress;
pub use progress::LogProgress;
