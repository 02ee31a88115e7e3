// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Filesystem child resources: directories, files, rendered templates and
//! symlinks. Each one converges on its own and reports whether it changed
//! anything on disk.

use crate::errors::{Error, Result};
use crate::template::{TemplateRenderer, TemplateSource, Variables};
use log::debug;
use std::fs::{DirBuilder, File, Metadata, Permissions};
use std::io::{self, ErrorKind, Read, Write};
use std::os::unix::fs::{DirBuilderExt, MetadataExt, PermissionsExt, fchown, symlink};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Directory,
    File,
    Template,
    Link,
    RemoveLink,
}

/// Identity of a child within one pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub path: PathBuf,
    pub kind: ResourceKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSpec {
    Directory,
    File {
        content: String,
    },
    Template {
        source: TemplateSource,
        variables: Variables,
    },
    /// Symlink at `path` pointing to `to`.
    Link {
        to: PathBuf,
    },
    /// Remove `path` if it is a symlink.
    RemoveLink,
}

/// User and group names (or numeric ids) applied to created files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ownership {
    pub owner: Option<String>,
    pub group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildResource {
    pub path: PathBuf,
    pub spec: ResourceSpec,
    pub mode: Option<u32>,
    pub ownership: Ownership,
}

impl ChildResource {
    pub fn directory(path: PathBuf) -> Self {
        Self::new(path, ResourceSpec::Directory, Some(0o755))
    }

    pub fn file(path: PathBuf, content: String, mode: u32) -> Self {
        Self::new(path, ResourceSpec::File { content }, Some(mode))
    }

    pub fn template(path: PathBuf, source: TemplateSource, variables: Variables, mode: u32) -> Self {
        Self::new(path, ResourceSpec::Template { source, variables }, Some(mode))
    }

    pub fn link(path: PathBuf, to: PathBuf) -> Self {
        Self::new(path, ResourceSpec::Link { to }, None)
    }

    pub fn remove_link(path: PathBuf) -> Self {
        Self::new(path, ResourceSpec::RemoveLink, None)
    }

    fn new(path: PathBuf, spec: ResourceSpec, mode: Option<u32>) -> Self {
        Self {
            path,
            spec,
            mode,
            ownership: Ownership::default(),
        }
    }

    pub fn owned_by(mut self, ownership: &Ownership) -> Self {
        self.ownership = ownership.clone();
        self
    }

    pub fn kind(&self) -> ResourceKind {
        match self.spec {
            ResourceSpec::Directory => ResourceKind::Directory,
            ResourceSpec::File { .. } => ResourceKind::File,
            ResourceSpec::Template { .. } => ResourceKind::Template,
            ResourceSpec::Link { .. } => ResourceKind::Link,
            ResourceSpec::RemoveLink => ResourceKind::RemoveLink,
        }
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey {
            path: self.path.clone(),
            kind: self.kind(),
        }
    }

    /// Bring the filesystem in line with this resource. Returns true when
    /// anything was created, rewritten, re-permissioned or removed.
    pub fn converge(&self, renderer: &dyn TemplateRenderer) -> Result<bool> {
        let changed = match &self.spec {
            ResourceSpec::Directory => self.converge_directory()?,
            ResourceSpec::File { content } => self.converge_file(content)?,
            ResourceSpec::Template { source, variables } => {
                let content = renderer.render(source, variables)?;
                self.converge_file(&content)?
            }
            ResourceSpec::Link { to } => converge_link(&self.path, to).map_err(self.err())?,
            ResourceSpec::RemoveLink => remove_link(&self.path).map_err(self.err())?,
        };
        debug!(
            "{:?} {}: {}",
            self.kind(),
            self.path.display(),
            if changed { "updated" } else { "up to date" }
        );
        Ok(changed)
    }

    fn err(&self) -> impl FnOnce(io::Error) -> Error {
        Error::resource(&self.path)
    }

    fn converge_directory(&self) -> Result<bool> {
        let meta = match std::fs::symlink_metadata(&self.path) {
            Ok(meta) if meta.is_dir() => meta,
            Ok(meta) if meta.file_type().is_symlink() => {
                debug!("replacing symlink {} with a directory", self.path.display());
                std::fs::remove_file(&self.path).map_err(self.err())?;
                return self.create_directory();
            }
            Ok(_) => return Err(self.in_the_way("exists and is not a directory")),
            Err(e) if e.kind() == ErrorKind::NotFound => return self.create_directory(),
            Err(e) => return Err(Error::resource(&self.path)(e)),
        };
        let dir = open_same(&self.path, &meta).map_err(self.err())?;
        self.converge_attributes(&dir, &meta)
    }

    fn create_directory(&self) -> Result<bool> {
        DirBuilder::new()
            .recursive(true)
            .mode(self.mode.unwrap_or(0o755))
            .create(&self.path)
            .map_err(self.err())?;
        let meta = std::fs::symlink_metadata(&self.path).map_err(self.err())?;
        let dir = open_same(&self.path, &meta).map_err(self.err())?;
        self.converge_attributes(&dir, &meta)?;
        Ok(true)
    }

    /// Files are never modified in place: any difference in content, mode or
    /// owner replaces the path with a fresh sibling file via rename. A
    /// symlink at the path is replaced, not followed.
    fn converge_file(&self, content: &str) -> Result<bool> {
        let uid = resolve_user(self.ownership.owner.as_deref()).map_err(self.err())?;
        let gid = resolve_group(self.ownership.group.as_deref()).map_err(self.err())?;

        match std::fs::symlink_metadata(&self.path) {
            Ok(meta) if meta.is_dir() => {
                return Err(self.in_the_way("a directory is in the way of the file"));
            }
            Ok(meta) if meta.is_file() => {
                let mut existing = Vec::new();
                open_same(&self.path, &meta)
                    .and_then(|mut file| file.read_to_end(&mut existing))
                    .map_err(self.err())?;
                let up_to_date = existing == content.as_bytes()
                    && self.mode.is_none_or(|mode| meta.mode() & 0o7777 == mode)
                    && uid.is_none_or(|uid| uid == meta.uid())
                    && gid.is_none_or(|gid| gid == meta.gid());
                if up_to_date {
                    return Ok(false);
                }
            }
            Ok(_) => debug!("replacing non-regular file {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(Error::resource(&self.path)(e)),
        }

        self.replace_file(content, uid, gid).map_err(self.err())?;
        Ok(true)
    }

    fn replace_file(&self, content: &str, uid: Option<u32>, gid: Option<u32>) -> io::Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::Builder::new()
            .prefix(".dd-runit")
            .tempfile_in(parent)?;
        tmp.write_all(content.as_bytes())?;
        if let Some(mode) = self.mode {
            tmp.as_file().set_permissions(Permissions::from_mode(mode))?;
        }
        if uid.is_some() || gid.is_some() {
            fchown(tmp.as_file(), uid, gid)?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Fix mode and ownership through an open handle so a path swapped after
    /// the check is never touched.
    fn converge_attributes(&self, file: &File, meta: &Metadata) -> Result<bool> {
        let mut changed = false;

        if let Some(mode) = self.mode
            && meta.mode() & 0o7777 != mode
        {
            file.set_permissions(Permissions::from_mode(mode))
                .map_err(self.err())?;
            changed = true;
        }

        let uid = resolve_user(self.ownership.owner.as_deref()).map_err(self.err())?;
        let gid = resolve_group(self.ownership.group.as_deref()).map_err(self.err())?;
        let uid = uid.filter(|uid| *uid != meta.uid());
        let gid = gid.filter(|gid| *gid != meta.gid());
        if uid.is_some() || gid.is_some() {
            fchown(file, uid, gid).map_err(self.err())?;
            changed = true;
        }

        Ok(changed)
    }

    fn in_the_way(&self, what: &'static str) -> Error {
        Error::Resource {
            path: self.path.clone(),
            source: io::Error::new(ErrorKind::AlreadyExists, what),
        }
    }
}

/// Open `path`, failing if it no longer is the object `meta` describes.
fn open_same(path: &Path, meta: &Metadata) -> io::Result<File> {
    let file = File::open(path)?;
    let opened = file.metadata()?;
    if opened.dev() != meta.dev() || opened.ino() != meta.ino() {
        return Err(io::Error::other("path was replaced while converging"));
    }
    Ok(file)
}

fn converge_link(path: &Path, to: &Path) -> io::Result<bool> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            if std::fs::read_link(path)? == to {
                return Ok(false);
            }
            std::fs::remove_file(path)?;
        }
        Ok(meta) if meta.is_dir() => {
            return Err(io::Error::new(
                ErrorKind::AlreadyExists,
                "a directory is in the way of the link",
            ));
        }
        Ok(_) => std::fs::remove_file(path)?,
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    symlink(to, path)?;
    Ok(true)
}

fn remove_link(path: &Path) -> io::Result<bool> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            std::fs::remove_file(path)?;
            Ok(true)
        }
        Ok(_) => Ok(false),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn resolve_user(name: Option<&str>) -> io::Result<Option<u32>> {
    let Some(name) = name else { return Ok(None) };
    if let Ok(uid) = name.parse() {
        return Ok(Some(uid));
    }
    uzers::get_user_by_name(name)
        .map(|user| Some(user.uid()))
        .ok_or_else(|| io::Error::new(ErrorKind::NotFound, format!("unknown user '{name}'")))
}

fn resolve_group(name: Option<&str>) -> io::Result<Option<u32>> {
    let Some(name) = name else { return Ok(None) };
    if let Ok(gid) = name.parse() {
        return Ok(Some(gid));
    }
    uzers::get_group_by_name(name)
        .map(|group| Some(group.gid()))
        .ok_or_else(|| io::Error::new(ErrorKind::NotFound, format!("unknown group '{name}'")))
}
