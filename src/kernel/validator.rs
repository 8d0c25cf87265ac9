//! Build result verification: the expected artifacts must exist on disk.

use crate::error::BuildError;
use crate::models::BuildPlan;
use std::fs;
use std::path::PathBuf;

/// The arch-specific boot image must exist and be non-empty.
pub fn verify_image(plan: &BuildPlan) -> Result<PathBuf, BuildError> {
    let image = plan.image_path();
    match fs::metadata(&image) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(image),
        Ok(_) => Err(BuildError::ArtifactMissing(format!(
            "{} exists but is empty or not a file",
            image.display()
        ))),
        Err(_) => Err(BuildError::ArtifactMissing(format!(
            "Kernel image not found: {}",
            image.display()
        ))),
    }
}

/// Binary RPMs written by `binrpm-pkg`, sorted by name.
pub fn find_rpms(plan: &BuildPlan) -> Vec<PathBuf> {
    let mut rpms: Vec<PathBuf> = fs::read_dir(plan.rpm_dir())
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().map_or(false, |ext| ext == "rpm"))
                .collect()
        })
        .unwrap_or_default();
    rpms.sort();
    rpms
}

/// At least one binary RPM must exist.
pub fn verify_rpms(plan: &BuildPlan) -> Result<Vec<PathBuf>, BuildError> {
    let rpms = find_rpms(plan);
    if rpms.is_empty() {
        return Err(BuildError::ArtifactMissing(format!(
            "No RPMs found in {}",
            plan.rpm_dir().display()
        )));
    }
    Ok(rpms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Arch, PhaseToggles, RepoChoice, Stream, Variant};

    fn plan(build_dir: PathBuf, arch: Arch) -> BuildPlan {
        BuildPlan {
            arch,
            host_arch: Some(arch),
            stream: Stream::Y,
            repo: RepoChoice::Centos,
            fork: None,
            variant: Variant::default(),
            toggles: PhaseToggles::default(),
            patches_dir: None,
            jobs: 1,
            source_dir: PathBuf::from("/src"),
            build_dir,
            log_dir: PathBuf::from("/logs"),
        }
    }

    #[test]
    fn test_verify_image() {
        let dir = tempfile::tempdir().unwrap();
        let p = plan(dir.path().to_path_buf(), Arch::Aarch64);
        assert!(verify_image(&p).is_err());

        let image = dir.path().join("arch/arm64/boot/Image.gz");
        fs::create_dir_all(image.parent().unwrap()).unwrap();
        fs::write(&image, "").unwrap();
        assert!(verify_image(&p).is_err(), "empty image must not count");

        fs::write(&image, "kernel").unwrap();
        assert_eq!(verify_image(&p).unwrap(), image);
    }

    #[test]
    fn test_verify_rpms() {
        let dir = tempfile::tempdir().unwrap();
        let p = plan(dir.path().to_path_buf(), Arch::X86_64);
        assert!(verify_rpms(&p).is_err());

        let rpm_dir = dir.path().join("rpmbuild/RPMS/x86_64");
        fs::create_dir_all(&rpm_dir).unwrap();
        fs::write(rpm_dir.join("kernel-headers-6.12.0.rpm"), "h").unwrap();
        fs::write(rpm_dir.join("kernel-6.12.0.rpm"), "k").unwrap();
        fs::write(rpm_dir.join("build.log"), "").unwrap();

        let rpms = verify_rpms(&p).unwrap();
        assert_eq!(rpms.len(), 2);
        assert!(rpms[0].ends_with("kernel-6.12.0.rpm"));
    }
}
