//! ABI bindings for the contracts the client talks to
//!
//! Only the functions and events the client actually calls are declared.

use alloy::sol;

sol! {
    /// ERC-20 underlying token
    interface IERC20 {
        function decimals() external view returns (uint8);
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    /// Interest-bearing market token (CErc20)
    interface IKToken {
        function mint(uint256 mintAmount) external returns (uint256);
        function redeem(uint256 redeemTokens) external returns (uint256);
        function redeemUnderlying(uint256 redeemAmount) external returns (uint256);
        function borrow(uint256 borrowAmount) external returns (uint256);
        function repayBorrow(uint256 repayAmount) external returns (uint256);
        function repayBorrowBehalf(address borrower, uint256 repayAmount) external returns (uint256);
        function exchangeRateStored() external view returns (uint256);

        event Failure(uint256 error, uint256 info, uint256 detail);
    }

    /// Comptroller (reached through the Unitroller proxy)
    interface IComptroller {
        function enterMarkets(address[] cTokens) external returns (uint256[]);
        function exitMarket(address cTokenAddress) external returns (uint256);
        function getAccountLiquidity(address account)
            external
            view
            returns (uint256 error, uint256 liquidity, uint256 shortfall);
        function getAllMarkets() external view returns (address[]);
        function markets(address cToken)
            external
            view
            returns (bool isListed, uint256 collateralFactorMantissa, bool isComped);
        function mintGuardianPaused(address cToken) external view returns (bool);

        event MarketEntered(address cToken, address account);
        event MarketExited(address cToken, address account);
    }
}
