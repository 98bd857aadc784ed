//! Backup command

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use vwbackup_core::{encrypt_archive, BackupBuilder, BackupConfig, BackupTargets};

use crate::cli::Cli;
use crate::output;
use crate::passphrase::read_passphrase;
use crate::paths::{plan_outputs, OutputRequest};
use crate::remote::{self, RemoteTarget};
use crate::upload::Uploader;

pub fn run(args: Cli) -> Result<()> {
    let quiet = args.quiet;

    // Validate everything that can fail before touching the filesystem
    let targets = BackupTargets::parse(&args.targets)?;

    let remote_target: Option<RemoteTarget> = args
        .rclone_destination
        .as_deref()
        .map(|destination| remote::resolve(args.rclone_config_file.as_deref(), destination))
        .transpose()?;

    let plan = plan_outputs(&OutputRequest {
        output: args.output.as_deref(),
        encrypt: args.encrypt,
        upload: remote_target.is_some(),
        preserve_archive: args.preserve_archive,
    })?;
    tracing::debug!("Output plan: {:?}", plan);

    if !quiet {
        output::header("Vaultwarden Backup");
        output::kv("Source", &args.source_dir.display().to_string());
        output::kv("Targets", &targets.to_string());
        output::kv("Output", &plan.final_artifact().display().to_string());
        if args.encrypt {
            output::kv("Encryption", "Enabled (AES-256-CBC, PBKDF2-SHA256)");
        }
        if let Some(target) = &remote_target {
            output::kv("Upload", &target.destination);
        }
        println!();
    }

    let config = BackupConfig::new(targets)
        .with_archive_base(args.archive_base_dir.as_str())
        .with_compression_level(args.compression);

    tracing::info!("Creating backup file");
    let spinner = output::spinner("Creating backup archive...", quiet);
    let built = BackupBuilder::new(config).create(&args.source_dir, &plan.archive_path);
    spinner.finish_and_clear();
    let result = built.with_context(|| {
        format!(
            "Failed to back up {} into {}",
            args.source_dir.display(),
            plan.archive_path.display()
        )
    })?;
    tracing::info!("Backup file created: {}", result.archive_path.display());

    let artifact: PathBuf = match &plan.encrypted_path {
        Some(destination) => {
            let passphrase = read_passphrase()?;
            if passphrase.is_empty() && !quiet {
                output::warning("Encrypting with an empty passphrase");
            }

            let spinner = output::spinner("Encrypting backup...", quiet);
            let encrypted = encrypt_archive(&result.archive_path, destination, &passphrase);
            spinner.finish_and_clear();

            let encrypted = encrypted.with_context(|| {
                format!(
                    "Failed to encrypt backup; the unencrypted archive is at {}",
                    result.archive_path.display()
                )
            })?;
            tracing::info!("Encrypted backup file created: {}", encrypted.display());
            encrypted
        }
        None => result.archive_path.clone(),
    };

    if let Some(target) = &remote_target {
        let uploader = Uploader::locate(target, &artifact)?;

        tracing::info!("Uploading {} to {}", artifact.display(), target.destination);
        let spinner = output::spinner(&format!("Uploading to {}...", target.remote), quiet);
        let uploaded = uploader.copy(&artifact, &target.destination);
        spinner.finish_and_clear();
        uploaded.with_context(|| {
            format!(
                "Upload failed; the backup is still at {}",
                artifact.display()
            )
        })?;
        tracing::info!("Backup uploaded to {}", target.destination);

        if plan.remove_after_upload {
            fs::remove_file(&artifact)
                .with_context(|| format!("Failed to remove {}", artifact.display()))?;
        }
    }

    if !quiet {
        println!();
        output::success("Backup created successfully");
        println!();
        match &remote_target {
            Some(target) if plan.remove_after_upload => output::kv("Location", &target.destination),
            _ => output::kv("Location", &artifact.display().to_string()),
        }
        output::kv("Entries", &output::format_number(result.entry_count as u64));
        output::kv("Size", &output::format_bytes(result.size_bytes));
        output::kv("Duration", &format!("{:.1}s", result.duration_seconds));
        if args.encrypt && std::env::var_os(crate::passphrase::PASSPHRASE_ENV).is_none() {
            println!();
            output::info("Set BACKUP_PASSPHRASE to run unattended");
        }
    }

    Ok(())
}
