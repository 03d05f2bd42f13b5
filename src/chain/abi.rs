//! Contract bindings
//!
//! Minimal surfaces of the three contracts the compounder touches: the
//! settlement/reward ERC-20s, the ERC-4626 vault, and the merkle reward
//! distributor. Claim amounts are cumulative totals-to-date per the
//! distributor's monotonic proof scheme.

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    #[sol(rpc)]
    interface IERC4626 {
        function deposit(uint256 assets, address receiver) external returns (uint256 shares);
        function redeem(uint256 shares, address receiver, address owner) external returns (uint256 assets);
        function balanceOf(address account) external view returns (uint256);
        function convertToAssets(uint256 shares) external view returns (uint256);
        function convertToShares(uint256 assets) external view returns (uint256);
        function previewDeposit(uint256 assets) external view returns (uint256);
        function previewRedeem(uint256 shares) external view returns (uint256);
        function asset() external view returns (address);
    }

    #[sol(rpc)]
    interface IMerklDistributor {
        function claim(
            address[] calldata users,
            address[] calldata tokens,
            uint256[] calldata amounts,
            bytes32[][] calldata proofs
        ) external;
    }
}
