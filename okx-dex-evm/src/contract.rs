//! Solidity interface definitions for on-chain interactions.
//!
//! Only the ERC-20 surface needed for allowance management and precision
//! lookups is declared.

use alloy_sol_types::sol;

sol! {
    /// Minimal ERC-20 interface.
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface IERC20 {
        function decimals() external view returns (uint8);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}
