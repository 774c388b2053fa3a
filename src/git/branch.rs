//! Local branches of a clone.

use crate::error::{ManagerError, Result};
use crate::git::GitOps;
use git2::BranchType;

fn branch_error(message: String) -> ManagerError {
    ManagerError::BranchError { message }
}

/// Listing and switching local branches.
pub trait BranchOps {
    /// Create `name` pointing at the HEAD commit without switching to it.
    fn create_branch(&self, name: &str) -> Result<()>;

    /// Switch the working tree and HEAD to an existing local branch.
    /// Local modifications that would be overwritten make this fail.
    fn checkout_branch(&self, name: &str) -> Result<()>;

    /// `git checkout -b`: errors if `name` is already taken.
    fn checkout_new_branch(&self, name: &str) -> Result<()>;

    /// Switch to `name`, creating it at HEAD first when missing.
    fn create_and_checkout(&self, name: &str) -> Result<()>;

    fn branch_exists(&self, name: &str) -> bool;

    /// Short name of the checked-out branch. A detached HEAD is an error.
    fn current_branch(&self) -> Result<String>;

    /// Remove a local branch. Without `force` only branches whose tip is
    /// reachable from HEAD are removed.
    fn delete_branch(&self, name: &str, force: bool) -> Result<()>;

    /// Local branch names in ascending order.
    fn list_branches(&self) -> Result<Vec<String>>;
}

impl BranchOps for GitOps {
    fn create_branch(&self, name: &str) -> Result<()> {
        if !git2::Branch::name_is_valid(name)? {
            return Err(branch_error(format!("'{}' is not a valid branch name", name)));
        }
        let tip = self.repo.head()?.peel_to_commit()?;
        self.repo.branch(name, &tip, false)?;
        tracing::debug!(branch = name, at = %tip.id(), "created branch");
        Ok(())
    }

    fn checkout_branch(&self, name: &str) -> Result<()> {
        let branch = self
            .repo
            .find_branch(name, BranchType::Local)
            .map_err(|_| branch_error(format!("no local branch named '{}'", name)))?;
        let refname = branch
            .get()
            .name()
            .ok_or_else(|| branch_error(format!("branch '{}' has a non-UTF-8 ref", name)))?
            .to_string();

        let target = branch.get().peel(git2::ObjectType::Commit)?;
        self.repo.checkout_tree(&target, None)?;
        self.repo.set_head(&refname)?;

        tracing::info!(branch = name, "switched branch");
        Ok(())
    }

    fn checkout_new_branch(&self, name: &str) -> Result<()> {
        if self.branch_exists(name) {
            return Err(branch_error(format!("a branch named '{}' already exists", name)));
        }
        self.create_branch(name)?;
        self.checkout_branch(name)
    }

    fn create_and_checkout(&self, name: &str) -> Result<()> {
        if !self.branch_exists(name) {
            self.create_branch(name)?;
        }
        self.checkout_branch(name)
    }

    fn branch_exists(&self, name: &str) -> bool {
        self.repo.find_branch(name, BranchType::Local).is_ok()
    }

    fn current_branch(&self) -> Result<String> {
        let head = self.repo.head()?;
        if !head.is_branch() {
            return Err(branch_error("HEAD is detached".into()));
        }
        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| branch_error("HEAD names a non-UTF-8 branch".into()))
    }

    fn delete_branch(&self, name: &str, force: bool) -> Result<()> {
        if self.current_branch().is_ok_and(|current| current == name) {
            return Err(branch_error(format!(
                "'{}' is checked out and cannot be deleted",
                name
            )));
        }

        let mut branch = self
            .repo
            .find_branch(name, BranchType::Local)
            .map_err(|_| branch_error(format!("no local branch named '{}'", name)))?;

        if !force {
            let head = self.repo.head()?.peel_to_commit()?.id();
            let tip = branch.get().peel_to_commit()?.id();
            let merged = tip == head || self.repo.graph_descendant_of(head, tip)?;
            if !merged {
                return Err(branch_error(format!(
                    "'{}' is not fully merged into HEAD; pass force to delete it",
                    name
                )));
            }
        }

        branch.delete()?;
        tracing::info!(branch = name, force, "deleted branch");
        Ok(())
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        let mut names = self
            .repo
            .branches(Some(BranchType::Local))?
            .map(|entry| -> Result<Option<String>> {
                let (branch, _) = entry?;
                Ok(branch.name()?.map(str::to_string))
            })
            .filter_map(Result::transpose)
            .collect::<Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }
}
