//! The media set entity arena.

use log::warn;

use arinc645::CheckValueType;

use crate::error::{Error, RefKind, Result};
use crate::media::{MediumNumber, OptionalMediumNumber, PartFlags};

/// Handle to an entity (directory, regular file, load or batch) inside a
/// [`MediaSet`]. Ids are only meaningful for the media set that created
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// File classes of the model. Files are classified by how they were
/// created, never by their filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Load,
    Batch,
}

/// Target hardware ids with their ordered position restrictions. An empty
/// position list means the load is not position-restricted for that id.
pub type TargetHardwareIdPositions = Vec<(String, Vec<String>)>;

/// Reference from a load to one of its data or support files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFileRef {
    /// The referenced regular file.
    pub file: NodeId,
    /// Part number of the file within this load.
    pub part_number: String,
    /// Per-entry Check Value override.
    pub check_value_type: Option<CheckValueType>,
}

/// Load payload.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadData {
    pub part_number: String,
    pub part_flags: PartFlags,
    /// Load type description and id (Supplement 3/4/5).
    pub load_type: Option<(String, u16)>,
    pub target_hardware_id_positions: TargetHardwareIdPositions,
    /// Opaque blob embedded in the load header; padded to even length on
    /// encode.
    pub user_defined_data: Vec<u8>,
    pub load_check_value_type: Option<CheckValueType>,
    pub data_files_check_value_type: Option<CheckValueType>,
    pub support_files_check_value_type: Option<CheckValueType>,
    pub(crate) data_files: Vec<LoadFileRef>,
    pub(crate) support_files: Vec<LoadFileRef>,
}

impl LoadData {
    pub fn data_files(&self) -> &[LoadFileRef] {
        &self.data_files
    }

    pub fn support_files(&self) -> &[LoadFileRef] {
        &self.support_files
    }

    /// The plain target hardware ids, in declaration order.
    pub fn target_hardware_ids(&self) -> impl Iterator<Item = &str> {
        self.target_hardware_id_positions.iter().map(|(id, _)| id.as_str())
    }
}

/// Batch payload.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchData {
    pub part_number: String,
    pub comment: String,
    pub(crate) targets: Vec<(String, Vec<NodeId>)>,
}

impl BatchData {
    /// Target hardware id/position entries with their ordered loads.
    pub fn targets(&self) -> &[(String, Vec<NodeId>)] {
        &self.targets
    }
}

#[derive(Debug, Clone)]
enum Payload {
    Directory { children: Vec<NodeId> },
    Regular,
    Load(Box<LoadData>),
    Batch(BatchData),
    /// Tombstone of a removed entity; the id stays invalid forever.
    Removed,
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    /// For files: the medium override. For containers: the default medium
    /// override inherited by children.
    medium_number: OptionalMediumNumber,
    /// Check Value override; meaningless for directories.
    check_value_type: Option<CheckValueType>,
    payload: Payload,
}

/// An ARINC 665 media set: the root of the entity tree.
///
/// Entities are created through the factory methods ([`add_subdirectory`],
/// [`add_regular_file`], [`add_load`], [`add_batch`]) which enforce name
/// validity and per-container uniqueness.
///
/// [`add_subdirectory`]: MediaSet::add_subdirectory
/// [`add_regular_file`]: MediaSet::add_regular_file
/// [`add_load`]: MediaSet::add_load
/// [`add_batch`]: MediaSet::add_batch
#[derive(Debug, Clone, Default)]
pub struct MediaSet {
    part_number: String,
    nodes: Vec<Node>,
    files_user_defined_data: Vec<u8>,
    loads_user_defined_data: Vec<u8>,
    batches_user_defined_data: Vec<u8>,
    media_set_check_value_type: Option<CheckValueType>,
    list_of_files_check_value_type: Option<CheckValueType>,
    list_of_loads_check_value_type: Option<CheckValueType>,
    list_of_batches_check_value_type: Option<CheckValueType>,
    files_check_value_type: Option<CheckValueType>,
}

impl MediaSet {
    pub fn new() -> Self {
        MediaSet {
            nodes: vec![Node {
                name: String::new(),
                parent: None,
                medium_number: None,
                check_value_type: None,
                payload: Payload::Directory { children: Vec::new() },
            }],
            ..Default::default()
        }
    }

    /// The root container.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn part_number(&self) -> &str {
        &self.part_number
    }

    pub fn set_part_number(&mut self, part_number: impl Into<String>) {
        self.part_number = part_number.into();
    }

    // --- node access -----------------------------------------------------

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    /// Name of an entity; empty for the root.
    pub fn name(&self, id: NodeId) -> &str {
        &self.node(id).name
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn is_directory(&self, id: NodeId) -> bool {
        matches!(self.node(id).payload, Payload::Directory { .. })
    }

    /// File class of an entity; `None` for directories and the root.
    pub fn file_kind(&self, id: NodeId) -> Option<FileKind> {
        match self.node(id).payload {
            Payload::Regular => Some(FileKind::Regular),
            Payload::Load(_) => Some(FileKind::Load),
            Payload::Batch(_) => Some(FileKind::Batch),
            _ => None,
        }
    }

    /// Children of a container, in insertion order.
    pub fn children(&self, container: NodeId) -> &[NodeId] {
        match &self.node(container).payload {
            Payload::Directory { children } => children,
            _ => &[],
        }
    }

    /// Looks up a direct child by name.
    pub fn child_by_name(&self, container: NodeId, name: &str) -> Option<NodeId> {
        self.children(container).iter().copied().find(|&child| self.name(child) == name)
    }

    /// Looks up a direct subdirectory by name.
    pub fn subdirectory(&self, container: NodeId, name: &str) -> Option<NodeId> {
        self.child_by_name(container, name).filter(|&child| self.is_directory(child))
    }

    /// Absolute path with `\` separators; the root is `\`.
    pub fn path(&self, id: NodeId) -> String {
        let node = self.node(id);
        match node.parent {
            None => "\\".to_owned(),
            Some(parent) => {
                let parent_path = self.path(parent);
                if parent_path == "\\" {
                    format!("\\{}", node.name)
                } else {
                    format!("{}\\{}", parent_path, node.name)
                }
            }
        }
    }

    /// Path of the containing directory.
    pub fn parent_path(&self, id: NodeId) -> String {
        match self.node(id).parent {
            None => "\\".to_owned(),
            Some(parent) => self.path(parent),
        }
    }

    // --- factories -------------------------------------------------------

    fn check_new_child(&self, container: NodeId, name: &str) -> Result<()> {
        if !matches!(self.node(container).payload, Payload::Directory { .. }) {
            return Err(Error::InvalidMediaSet("parent is not a container"));
        }
        if name.is_empty() || name == "." || name == ".." || name.contains(['\\', '/']) {
            return Err(Error::InvalidName { name: name.to_owned() });
        }
        if self.child_by_name(container, name).is_some() {
            return Err(Error::Duplicate { name: name.to_owned() });
        }
        Ok(())
    }

    fn insert_node(&mut self, container: NodeId, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        match &mut self.node_mut(container).payload {
            Payload::Directory { children } => children.push(id),
            _ => unreachable!("checked by check_new_child"),
        }
        id
    }

    /// Adds a subdirectory to a container.
    pub fn add_subdirectory(&mut self, container: NodeId, name: impl Into<String>) -> Result<NodeId> {
        let name = name.into();
        self.check_new_child(container, &name)?;
        Ok(self.insert_node(container, Node {
            name,
            parent: Some(container),
            medium_number: None,
            check_value_type: None,
            payload: Payload::Directory { children: Vec::new() },
        }))
    }

    /// Adds a regular file to a container.
    pub fn add_regular_file(
        &mut self,
        container: NodeId,
        name: impl Into<String>,
        medium_number: OptionalMediumNumber,
    ) -> Result<NodeId> {
        let name = name.into();
        self.check_new_child(container, &name)?;
        Ok(self.insert_node(container, Node {
            name,
            parent: Some(container),
            medium_number,
            check_value_type: None,
            payload: Payload::Regular,
        }))
    }

    /// Adds a load to a container.
    pub fn add_load(
        &mut self,
        container: NodeId,
        name: impl Into<String>,
        medium_number: OptionalMediumNumber,
    ) -> Result<NodeId> {
        let name = name.into();
        self.check_new_child(container, &name)?;
        Ok(self.insert_node(container, Node {
            name,
            parent: Some(container),
            medium_number,
            check_value_type: None,
            payload: Payload::Load(Box::default()),
        }))
    }

    /// Adds a batch to a container.
    pub fn add_batch(
        &mut self,
        container: NodeId,
        name: impl Into<String>,
        medium_number: OptionalMediumNumber,
    ) -> Result<NodeId> {
        let name = name.into();
        self.check_new_child(container, &name)?;
        Ok(self.insert_node(container, Node {
            name,
            parent: Some(container),
            medium_number,
            check_value_type: None,
            payload: Payload::Batch(BatchData::default()),
        }))
    }

    // --- loads and batches -----------------------------------------------

    pub fn load(&self, id: NodeId) -> Result<&LoadData> {
        match &self.node(id).payload {
            Payload::Load(data) => Ok(data),
            _ => Err(Error::InvalidMediaSet("entity is not a load")),
        }
    }

    /// Mutable load payload. File references are edited through
    /// [`add_load_data_file`]/[`add_load_support_file`], which validate
    /// them.
    ///
    /// [`add_load_data_file`]: MediaSet::add_load_data_file
    /// [`add_load_support_file`]: MediaSet::add_load_support_file
    pub fn load_mut(&mut self, id: NodeId) -> Result<&mut LoadData> {
        match &mut self.node_mut(id).payload {
            Payload::Load(data) => Ok(data),
            _ => Err(Error::InvalidMediaSet("entity is not a load")),
        }
    }

    pub fn batch(&self, id: NodeId) -> Result<&BatchData> {
        match &self.node(id).payload {
            Payload::Batch(data) => Ok(data),
            _ => Err(Error::InvalidMediaSet("entity is not a batch")),
        }
    }

    /// Mutable batch payload. Targets are edited through
    /// [`add_batch_target`][MediaSet::add_batch_target], which validates
    /// the load references.
    pub fn batch_mut(&mut self, id: NodeId) -> Result<&mut BatchData> {
        match &mut self.node_mut(id).payload {
            Payload::Batch(data) => Ok(data),
            _ => Err(Error::InvalidMediaSet("entity is not a batch")),
        }
    }

    /// Appends a data file reference to a load. The referenced entity must
    /// be a regular file of this media set.
    pub fn add_load_data_file(
        &mut self,
        load: NodeId,
        file: NodeId,
        part_number: impl Into<String>,
        check_value_type: Option<CheckValueType>,
    ) -> Result<()> {
        self.check_file_ref(file, RefKind::DataFile)?;
        let reference = LoadFileRef { file, part_number: part_number.into(), check_value_type };
        self.load_mut(load)?.data_files.push(reference);
        Ok(())
    }

    /// Appends a support file reference to a load. The referenced entity
    /// must be a regular file of this media set.
    pub fn add_load_support_file(
        &mut self,
        load: NodeId,
        file: NodeId,
        part_number: impl Into<String>,
        check_value_type: Option<CheckValueType>,
    ) -> Result<()> {
        self.check_file_ref(file, RefKind::SupportFile)?;
        let reference = LoadFileRef { file, part_number: part_number.into(), check_value_type };
        self.load_mut(load)?.support_files.push(reference);
        Ok(())
    }

    fn check_file_ref(&self, file: NodeId, kind: RefKind) -> Result<()> {
        if self.file_kind(file) != Some(FileKind::Regular) {
            return Err(Error::CrossReferenceMissing {
                kind,
                name: self.name(file).to_owned(),
            });
        }
        Ok(())
    }

    /// Appends a target hardware entry to a batch. Every referenced load
    /// must be a load of this media set.
    pub fn add_batch_target(
        &mut self,
        batch: NodeId,
        target_hardware_id_position: impl Into<String>,
        loads: Vec<NodeId>,
    ) -> Result<()> {
        for &load in &loads {
            if self.file_kind(load) != Some(FileKind::Load) {
                return Err(Error::CrossReferenceMissing {
                    kind: RefKind::Load,
                    name: self.name(load).to_owned(),
                });
            }
        }
        self.batch_mut(batch)?.targets.push((target_hardware_id_position.into(), loads));
        Ok(())
    }

    // --- medium numbers --------------------------------------------------

    /// The medium override of a file, or the default override of a
    /// container.
    pub fn medium_number(&self, id: NodeId) -> OptionalMediumNumber {
        self.node(id).medium_number
    }

    pub fn set_medium_number(&mut self, id: NodeId, medium_number: OptionalMediumNumber) {
        self.node_mut(id).medium_number = medium_number;
    }

    /// The medium a file is effectively placed on: its own override, or
    /// the nearest ancestor default, or medium 1.
    pub fn effective_medium_number(&self, id: NodeId) -> MediumNumber {
        let mut current = Some(id);
        while let Some(id) = current {
            let node = self.node(id);
            if let Some(medium) = node.medium_number {
                return medium;
            }
            current = node.parent;
        }
        MediumNumber::FIRST
    }

    /// The highest effective medium number of any file; every media set
    /// spans at least medium 1.
    pub fn last_medium_number(&self) -> MediumNumber {
        self.recursive_files(self.root())
            .into_iter()
            .map(|file| self.effective_medium_number(file))
            .max()
            .unwrap_or(MediumNumber::FIRST)
    }

    /// Whether any file in the subtree is effectively placed on the
    /// medium.
    pub fn container_on_medium(&self, container: NodeId, medium: MediumNumber) -> bool {
        self.recursive_files(container)
            .into_iter()
            .any(|file| self.effective_medium_number(file) == medium)
    }

    // --- check value types -----------------------------------------------

    /// Check Value override of a file.
    pub fn check_value_type(&self, id: NodeId) -> Option<CheckValueType> {
        self.node(id).check_value_type
    }

    pub fn set_check_value_type(&mut self, id: NodeId, check_value_type: Option<CheckValueType>) {
        self.node_mut(id).check_value_type = check_value_type;
    }

    pub fn media_set_check_value_type(&self) -> Option<CheckValueType> {
        self.media_set_check_value_type
    }

    pub fn set_media_set_check_value_type(&mut self, check_value_type: Option<CheckValueType>) {
        self.media_set_check_value_type = check_value_type;
    }

    pub fn list_of_files_check_value_type(&self) -> Option<CheckValueType> {
        self.list_of_files_check_value_type
    }

    pub fn set_list_of_files_check_value_type(&mut self, check_value_type: Option<CheckValueType>) {
        self.list_of_files_check_value_type = check_value_type;
    }

    pub fn list_of_loads_check_value_type(&self) -> Option<CheckValueType> {
        self.list_of_loads_check_value_type
    }

    pub fn set_list_of_loads_check_value_type(&mut self, check_value_type: Option<CheckValueType>) {
        self.list_of_loads_check_value_type = check_value_type;
    }

    pub fn list_of_batches_check_value_type(&self) -> Option<CheckValueType> {
        self.list_of_batches_check_value_type
    }

    pub fn set_list_of_batches_check_value_type(
        &mut self,
        check_value_type: Option<CheckValueType>,
    ) {
        self.list_of_batches_check_value_type = check_value_type;
    }

    pub fn files_check_value_type(&self) -> Option<CheckValueType> {
        self.files_check_value_type
    }

    pub fn set_files_check_value_type(&mut self, check_value_type: Option<CheckValueType>) {
        self.files_check_value_type = check_value_type;
    }

    pub fn effective_media_set_check_value_type(&self) -> CheckValueType {
        self.media_set_check_value_type.unwrap_or(CheckValueType::NotUsed)
    }

    pub fn effective_list_of_files_check_value_type(&self) -> CheckValueType {
        self.list_of_files_check_value_type
            .unwrap_or_else(|| self.effective_media_set_check_value_type())
    }

    pub fn effective_files_check_value_type(&self) -> CheckValueType {
        self.files_check_value_type.unwrap_or_else(|| self.effective_media_set_check_value_type())
    }

    pub fn effective_list_of_loads_check_value_type(&self) -> CheckValueType {
        self.list_of_loads_check_value_type
            .unwrap_or_else(|| self.effective_files_check_value_type())
    }

    pub fn effective_list_of_batches_check_value_type(&self) -> CheckValueType {
        self.list_of_batches_check_value_type
            .unwrap_or_else(|| self.effective_files_check_value_type())
    }

    /// Effective Check Value algorithm for a file's `FILES.LUM` row.
    pub fn effective_file_check_value_type(&self, file: NodeId) -> CheckValueType {
        self.node(file)
            .check_value_type
            .unwrap_or_else(|| self.effective_files_check_value_type())
    }

    /// Effective Load Check Value algorithm of a load.
    pub fn effective_load_check_value_type(&self, load: NodeId) -> Result<CheckValueType> {
        Ok(self
            .load(load)?
            .load_check_value_type
            .unwrap_or_else(|| self.effective_media_set_check_value_type()))
    }

    /// Effective Check Value algorithm for a load's data file entries.
    pub fn effective_data_files_check_value_type(&self, load: NodeId) -> Result<CheckValueType> {
        Ok(self
            .load(load)?
            .data_files_check_value_type
            .unwrap_or_else(|| self.effective_media_set_check_value_type()))
    }

    /// Effective Check Value algorithm for a load's support file entries.
    pub fn effective_support_files_check_value_type(&self, load: NodeId) -> Result<CheckValueType> {
        Ok(self
            .load(load)?
            .support_files_check_value_type
            .unwrap_or_else(|| self.effective_media_set_check_value_type()))
    }

    // --- user defined data -----------------------------------------------

    pub fn files_user_defined_data(&self) -> &[u8] {
        &self.files_user_defined_data
    }

    pub fn set_files_user_defined_data(&mut self, data: Vec<u8>) {
        self.files_user_defined_data = pad_user_defined_data(data);
    }

    pub fn loads_user_defined_data(&self) -> &[u8] {
        &self.loads_user_defined_data
    }

    pub fn set_loads_user_defined_data(&mut self, data: Vec<u8>) {
        self.loads_user_defined_data = pad_user_defined_data(data);
    }

    pub fn batches_user_defined_data(&self) -> &[u8] {
        &self.batches_user_defined_data
    }

    pub fn set_batches_user_defined_data(&mut self, data: Vec<u8>) {
        self.batches_user_defined_data = pad_user_defined_data(data);
    }

    // --- recursive queries -----------------------------------------------

    /// All files in the subtree, depth first: the container's own files in
    /// insertion order, then each subdirectory in insertion order.
    pub fn recursive_files(&self, container: NodeId) -> Vec<NodeId> {
        let mut files = Vec::new();
        self.collect_files(container, None, None, &mut files);
        files
    }

    /// Files in the subtree filtered by name and/or effective medium.
    pub fn recursive_files_filtered(
        &self,
        container: NodeId,
        filename: Option<&str>,
        medium: OptionalMediumNumber,
    ) -> Vec<NodeId> {
        let mut files = Vec::new();
        self.collect_files(container, filename, medium, &mut files);
        files
    }

    fn collect_files(
        &self,
        container: NodeId,
        filename: Option<&str>,
        medium: OptionalMediumNumber,
        into: &mut Vec<NodeId>,
    ) {
        for &child in self.children(container) {
            if self.file_kind(child).is_some()
                && filename.is_none_or(|filename| self.name(child) == filename)
                && medium.is_none_or(|medium| self.effective_medium_number(child) == medium)
            {
                into.push(child);
            }
        }
        for &child in self.children(container) {
            if self.is_directory(child) {
                self.collect_files(child, filename, medium, into);
            }
        }
    }

    fn recursive_of_kind(
        &self,
        container: NodeId,
        kind: FileKind,
        filename: Option<&str>,
    ) -> Vec<NodeId> {
        self.recursive_files_filtered(container, filename, None)
            .into_iter()
            .filter(|&file| self.file_kind(file) == Some(kind))
            .collect()
    }

    pub fn recursive_regular_files(
        &self,
        container: NodeId,
        filename: Option<&str>,
    ) -> Vec<NodeId> {
        self.recursive_of_kind(container, FileKind::Regular, filename)
    }

    pub fn recursive_loads(&self, container: NodeId, filename: Option<&str>) -> Vec<NodeId> {
        self.recursive_of_kind(container, FileKind::Load, filename)
    }

    pub fn recursive_batches(&self, container: NodeId, filename: Option<&str>) -> Vec<NodeId> {
        self.recursive_of_kind(container, FileKind::Batch, filename)
    }

    /// Subdirectories of a container, in insertion order.
    pub fn subdirectories(&self, container: NodeId) -> Vec<NodeId> {
        self.children(container)
            .iter()
            .copied()
            .filter(|&child| self.is_directory(child))
            .collect()
    }

    // --- back references -------------------------------------------------

    /// Loads referencing the regular file as data or support file.
    pub fn loads_with_file(&self, file: NodeId) -> Vec<NodeId> {
        self.recursive_loads(self.root(), None)
            .into_iter()
            .filter(|&load| {
                let data = self.load(load).expect("query returned a load");
                data.data_files.iter().chain(&data.support_files).any(|r| r.file == file)
            })
            .collect()
    }

    /// Batches referencing the load in any target entry.
    pub fn batches_with_load(&self, load: NodeId) -> Vec<NodeId> {
        self.recursive_batches(self.root(), None)
            .into_iter()
            .filter(|&batch| {
                let data = self.batch(batch).expect("query returned a batch");
                data.targets.iter().any(|(_, loads)| loads.contains(&load))
            })
            .collect()
    }

    // --- removal ---------------------------------------------------------

    /// Removes a file. Fails with [`Error::InUse`] when a regular file is
    /// referenced by a load, or a load by a batch.
    pub fn remove_file(&mut self, id: NodeId) -> Result<()> {
        match self.file_kind(id) {
            None => return Err(Error::InvalidMediaSet("entity is not a file")),
            Some(FileKind::Regular) => {
                if !self.loads_with_file(id).is_empty() {
                    return Err(Error::InUse { name: self.name(id).to_owned() });
                }
            }
            Some(FileKind::Load) => {
                if !self.batches_with_load(id).is_empty() {
                    return Err(Error::InUse { name: self.name(id).to_owned() });
                }
            }
            Some(FileKind::Batch) => {}
        }
        self.detach(id);
        Ok(())
    }

    /// Removes a subdirectory and its contents. Fails with
    /// [`Error::InUse`] when anything inside is referenced from outside
    /// the subtree.
    pub fn remove_subdirectory(&mut self, id: NodeId) -> Result<()> {
        if !self.is_directory(id) || self.node(id).parent.is_none() {
            return Err(Error::InvalidMediaSet("entity is not a removable directory"));
        }

        let subtree: std::collections::HashSet<NodeId> =
            self.recursive_files(id).into_iter().collect();

        for &file in &subtree {
            let referencing: Vec<NodeId> = match self.file_kind(file) {
                Some(FileKind::Regular) => self.loads_with_file(file),
                Some(FileKind::Load) => self.batches_with_load(file),
                _ => Vec::new(),
            };
            if referencing.iter().any(|referee| !subtree.contains(referee)) {
                return Err(Error::InUse { name: self.name(file).to_owned() });
            }
        }

        self.detach(id);
        Ok(())
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            if let Payload::Directory { children } = &mut self.node_mut(parent).payload {
                children.retain(|&child| child != id);
            }
        }
        let node = self.node_mut(id);
        node.parent = None;
        node.payload = Payload::Removed;
    }
}

fn pad_user_defined_data(mut data: Vec<u8>) -> Vec<u8> {
    if data.len() % 2 != 0 {
        warn!("user defined data must be 16-bit aligned - extending by one zero byte");
        data.push(0);
    }
    data
}
