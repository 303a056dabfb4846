use std::path::PathBuf;

use pak_core::error::Result;
use pak_core::{
    CancelFlag, Catalog, Cleaner, DiskProbe, HashStore, Outcome, PakFile, UnpackEvent, Unpacker,
};

pub fn handle_list(paks_dir: PathBuf, mount_root: PathBuf, long: bool) -> Result<()> {
    let catalog = Catalog::open(&paks_dir, &mount_root)?;

    for pak in catalog.paks() {
        println!(
            "{} v{} ({} entries, {} bytes)",
            pak.path().display(),
            pak.footer().version,
            pak.index().entries.len(),
            pak.index().total_entries_size(),
        );
        if long {
            for entry in &pak.index().entries {
                println!(
                    "  {:>12}  {:>12}  {}  {}",
                    entry.offset,
                    entry.size,
                    entry.hash,
                    pak.index().resolve(entry).display(),
                );
            }
        }
    }
    println!("{} packaged files total", catalog.packed_file_count());
    Ok(())
}

pub fn handle_extract(
    paks_dir: PathBuf,
    dest: PathBuf,
    missing: bool,
    files: Vec<PathBuf>,
    mount_root: PathBuf,
) -> Result<()> {
    let catalog = Catalog::open(&paks_dir, &mount_root)?;
    let mut store = HashStore::open(&dest)?;
    let cancel = CancelFlag::new();

    let selection = if missing {
        let total = catalog.packed_file_count();
        catalog.select_missing_and_unverified(&store, &dest, &cancel, |scanned| {
            if scanned % 5000 == 0 {
                eprintln!("scanned {scanned}/{total} files");
            }
        })?
    } else if !files.is_empty() {
        catalog.select_files(&files)?
    } else {
        catalog.select_all()
    };

    if selection.is_empty() {
        println!("nothing to extract");
        return Ok(());
    }

    let probe = DiskProbe;
    let mut unpacker = Unpacker::new(&catalog, &mut store, &probe, cancel);
    let outcome = unpacker.unpack(&selection, &dest, |event| match event {
        UnpackEvent::Begin { total_paks, total } => {
            println!(
                "extracting {} files ({} bytes) from {total_paks} containers",
                total.files_to_extract, total.bytes_to_extract
            );
        }
        UnpackEvent::PakBegin { pak, current_pak } => {
            println!("[{current_pak}] {}", pak.display());
        }
        UnpackEvent::PakFinished { elapsed, .. } => {
            println!("  finished in {elapsed:.1?}");
        }
        UnpackEvent::FileExtracted { .. } | UnpackEvent::BytesExtracted { .. } => {}
    })?;

    match outcome {
        Outcome::Finished { elapsed } => println!("done in {elapsed:.1?}"),
        Outcome::Aborted => println!("aborted"),
    }
    Ok(())
}

pub fn handle_clean(dest: PathBuf) -> Result<()> {
    let mut store = HashStore::open(&dest)?;
    let mut cleaner = Cleaner::new(&mut store, CancelFlag::new());
    let report = cleaner.clean(&dest, |_| {})?;

    println!(
        "scanned {} files, deleted {} ({} bytes freed)",
        report.files_scanned, report.files_deleted, report.bytes_freed
    );
    Ok(())
}

pub fn handle_append(
    pak: PathBuf,
    input: PathBuf,
    target: PathBuf,
    mount_root: PathBuf,
) -> Result<()> {
    let mut pak = PakFile::load(&pak, &mount_root)?;
    pak.append_file(&input, &target)?;
    pak.save()?;
    println!("appended {} as {}", input.display(), target.display());
    Ok(())
}

pub fn handle_replace(
    pak: PathBuf,
    target: PathBuf,
    input: PathBuf,
    mount_root: PathBuf,
) -> Result<()> {
    let mut pak = PakFile::load(&pak, &mount_root)?;
    pak.replace_file(&target, &input)?;
    pak.save()?;
    println!("replaced {}", target.display());
    Ok(())
}

pub fn handle_delete(pak: PathBuf, paths: Vec<PathBuf>, mount_root: PathBuf) -> Result<()> {
    let mut pak = PakFile::load(&pak, &mount_root)?;
    pak.soft_delete(&paths)?;
    pak.save()?;
    println!("deleted {} entries", paths.len());
    Ok(())
}

pub fn handle_rename(
    pak: PathBuf,
    paths: Vec<PathBuf>,
    suffix: String,
    mount_root: PathBuf,
) -> Result<()> {
    let mut pak = PakFile::load(&pak, &mount_root)?;
    pak.rename_with_suffix(&paths, &suffix)?;
    pak.save()?;
    println!("renamed {} entries with suffix {suffix}", paths.len());
    Ok(())
}
