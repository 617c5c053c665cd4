use eip_reconciler_core::contract::AddressAssociation;

use super::PlatformError;

pub trait AddressManager {
    fn associations_for_instance(
        &self,
        instance_id: &str,
    ) -> Result<Vec<AddressAssociation>, PlatformError>;

    /// Binds the allocation to `instance_id`, moving it off any instance it
    /// is currently attached to. Returns the new association id when the API
    /// reports one.
    fn associate(
        &self,
        allocation_id: &str,
        instance_id: &str,
    ) -> Result<Option<String>, PlatformError>;
}
