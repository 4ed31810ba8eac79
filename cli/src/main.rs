use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use inospect_core::open_device;
use inospect_filesystems::ext2::{
    classify, dir_entries, file_blocks, inode_view, resolve_path, Ext2Volume, InodeView, NodeKind,
    SlotKind,
};

#[derive(Parser)]
#[command(name = "inospect")]
#[command(about = "Read-only ext2 inode and data inspector", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show inode metadata for a path
    Inode {
        /// Block device or image file
        device: PathBuf,
        /// Absolute path inside the filesystem
        path: String,
    },
    /// Dump file bytes or directory entries for a path
    Data {
        /// Block device or image file
        device: PathBuf,
        /// Absolute path inside the filesystem
        path: String,
    },
    /// Show filesystem information
    Info {
        /// Block device or image file
        device: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Inode { device, path } => {
            let volume = open_volume(&device)?;
            let ino = resolve_path(&volume, &path)
                .with_context(|| format!("resolving '{}'", path))?;
            let view = inode_view(&volume, ino)?;
            print_inode(&view);
        }
        Commands::Data { device, path } => {
            let volume = open_volume(&device)?;
            let ino = resolve_path(&volume, &path)
                .with_context(|| format!("resolving '{}'", path))?;
            let inode = volume.inode_record(ino)?;

            match classify(ino, &inode)? {
                NodeKind::RegularFile => {
                    let stdout = std::io::stdout();
                    let mut out = stdout.lock();
                    for block in file_blocks(&volume, &inode) {
                        out.write_all(&block?)?;
                    }
                }
                NodeKind::Directory => {
                    for entry in dir_entries(&volume, &inode) {
                        let entry = entry?;
                        println!(
                            "{}\t{:<9}\t{}",
                            entry.inode,
                            entry.file_type.label(),
                            entry.name_string()
                        );
                    }
                }
            }
        }
        Commands::Info { device } => {
            let volume = open_volume(&device)?;
            let info = volume.info();
            println!("Filesystem: ext2 (revision {})", info.revision);
            println!("Label: {}", info.label.as_deref().unwrap_or("<none>"));
            println!("UUID: {}", info.uuid.as_deref().unwrap_or("<none>"));
            println!("Block size: {}", info.block_size);
            println!("Blocks: {} total, {} free, {} reserved",
                info.block_count, info.free_blocks, info.reserved_blocks);
            println!("Inodes: {} total, {} free, {} per group",
                info.total_inodes, info.free_inodes, info.inodes_per_group);
        }
    }

    Ok(())
}

fn open_volume(device: &PathBuf) -> anyhow::Result<Ext2Volume<File>> {
    let file = open_device(device)
        .with_context(|| format!("opening device {}", device.display()))?;
    let volume = Ext2Volume::open(file)
        .with_context(|| format!("reading ext2 superblock from {}", device.display()))?;
    Ok(volume)
}

fn print_inode(view: &InodeView) {
    println!(
        "Inode: {} Type: {:#x} Mode: 0{:o} Flags: {:#x}",
        view.ino, view.file_type_bits, view.permissions, view.flags
    );
    println!("Generation: {}", view.generation);
    println!("User: {} Group: {} Size: {}", view.uid, view.gid, view.size);
    println!("File ACL: {}", view.file_acl);
    println!("Links: {} Blockcount: {}", view.links_count, view.sector_count);
    println!("ctime: {:#x}", view.ctime);
    println!("atime: {:#x}", view.atime);
    println!("mtime: {:#x}", view.mtime);

    println!("BLOCKS:");
    for slot in &view.slots {
        match slot.kind {
            SlotKind::Direct(i) => println!("Direct data block ({}): {}", i, slot.addr),
            SlotKind::SingleIndirect => println!("Single indirect data block: {}", slot.addr),
            SlotKind::DoubleIndirect => println!("Double indirect data block: {}", slot.addr),
            SlotKind::TripleIndirect => println!("Triple indirect data block: {}", slot.addr),
        }
    }
}
