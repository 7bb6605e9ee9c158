use crate::errors::VliError;
use crate::manifest::{
    validation,
    Manifest,
};
use crate::provision::device;
use crate::sanity;
use crate::utils::shell::SystemExecutor;

pub(super) fn run(manifest: &Manifest) -> Result<(), VliError> {
    let start = std::time::Instant::now();

    validation::validate(manifest)?;
    sanity::check(manifest)?;
    device::validate(&mut SystemExecutor, &manifest.device, &manifest.volumes.vg)?;

    println!("validation done in {:?}", start.elapsed());

    Ok(())
}
